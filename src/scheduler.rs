//! Translates alarm records into trigger backend calls.
//!
//! The scheduler keeps no state of its own. Everything it asks the backend
//! to hold can be derived again from the store, which is what
//! [`AlarmScheduler::reconcile`] does after the backend lost its triggers.

use log::{debug, warn};

use crate::{
    alarm::Alarm,
    backend::TriggerBackend,
    error::SchedulingFailure,
    store::AlarmEvent,
    trigger::{Trigger, TriggerId},
};

/// Schedules `trigger`, cancelling first on backends that don't replace by id.
pub(crate) fn schedule<B: TriggerBackend + ?Sized>(
    backend: &mut B,
    trigger: Trigger,
) -> Result<(), SchedulingFailure> {
    if !backend.upserts() {
        cancel(backend, &trigger.id)?;
    }
    let id = trigger.id.clone();
    debug!("scheduling {id} {}", trigger.recurrence);
    backend
        .schedule(trigger)
        .map_err(|source| SchedulingFailure::Schedule { id, source })
}

pub(crate) fn cancel<B: TriggerBackend + ?Sized>(
    backend: &mut B,
    id: &TriggerId,
) -> Result<(), SchedulingFailure> {
    debug!("cancelling {id}");
    backend.cancel(id).map_err(|source| SchedulingFailure::Cancel {
        id: id.clone(),
        source,
    })
}

#[derive(Debug)]
pub struct AlarmScheduler<B> {
    backend: B,
}

impl<B: TriggerBackend> AlarmScheduler<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// schedules the daily trigger of `alarm` if it is enabled
    pub fn on_alarm_created(&mut self, alarm: &Alarm) -> Result<(), SchedulingFailure> {
        if !alarm.enabled {
            debug!("alarm {} is disabled, nothing to schedule", alarm.id);
            return Ok(());
        }
        schedule(&mut self.backend, Trigger::primary(alarm))
    }

    /// Replaces the daily trigger, backend triggers can't be edited.
    ///
    /// The new trigger is scheduled even if the cancel failed, an upserting
    /// backend replaces the old one anyway. The first failure is reported.
    pub fn on_alarm_updated(&mut self, old: &Alarm, new: &Alarm) -> Result<(), SchedulingFailure> {
        let cancelled = cancel(&mut self.backend, &TriggerId::primary(&old.id));
        let created = self.on_alarm_created(new);
        cancelled.and(created)
    }

    /// Cancels both triggers of `alarm`, clearing an outstanding snooze too.
    ///
    /// The second cancel is attempted even if the first one fails.
    pub fn on_alarm_deleted(&mut self, alarm: &Alarm) -> Result<(), SchedulingFailure> {
        let primary = cancel(&mut self.backend, &TriggerId::primary(&alarm.id));
        let snooze = cancel(&mut self.backend, &TriggerId::snooze(&alarm.id));
        primary.and(snooze)
    }

    /// `alarm` carries its new enabled flag
    pub fn on_alarm_toggled(&mut self, alarm: &Alarm) -> Result<(), SchedulingFailure> {
        if alarm.enabled {
            self.on_alarm_created(alarm)
        } else {
            self.on_alarm_deleted(alarm)
        }
    }

    pub fn apply(&mut self, event: &AlarmEvent) -> Result<(), SchedulingFailure> {
        match event {
            AlarmEvent::Created(alarm) => self.on_alarm_created(alarm),
            AlarmEvent::Updated { old, new } => self.on_alarm_updated(old, new),
            AlarmEvent::Deleted(alarm) => self.on_alarm_deleted(alarm),
            AlarmEvent::Toggled(alarm) => self.on_alarm_toggled(alarm),
        }
    }

    /// Clears the backend and schedules every enabled alarm again.
    ///
    /// A failing alarm doesn't stop the sweep; the first failure is returned
    /// once every alarm was tried. Returns how many triggers were scheduled.
    pub fn reconcile<'a>(
        &mut self,
        alarms: impl IntoIterator<Item = &'a Alarm>,
    ) -> Result<usize, SchedulingFailure> {
        self.backend
            .cancel_all()
            .map_err(SchedulingFailure::Reset)?;
        let mut scheduled = 0;
        let mut first_failure = None;
        for alarm in alarms.into_iter().filter(|alarm| alarm.enabled) {
            match schedule(&mut self.backend, Trigger::primary(alarm)) {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    warn!("reconciling alarm {}: {e}", alarm.id);
                    first_failure.get_or_insert(e);
                }
            }
        }
        first_failure.map_or(Ok(scheduled), Err)
    }
}
