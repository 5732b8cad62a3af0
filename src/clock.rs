//! The single writer over alarm state.
//!
//! [`AlarmClock`] owns the store, the scheduler and the snooze machine, and
//! every mutation or fired trigger goes through `&mut self`. Whoever owns
//! the clock therefore decides the order in which events for an alarm are
//! applied; the daemon does that from one thread.

use log::{info, warn};

use crate::{
    alarm::{Alarm, AlarmId},
    backend::{TriggerBackend, UserAction},
    communication::SoundCue,
    error::{Result, SchedulingFailure},
    payload::{Payload, RawPayload},
    scheduler::AlarmScheduler,
    snooze::{SnoozeMachine, SnoozeSettings, SnoozeState, SnoozeTransition},
    store::{AlarmEvent, AlarmStore},
    trigger::{TriggerId, TriggerKind},
};

/// why a fired trigger was not acted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// the identifier was not produced by this crate
    ForeignTrigger(TriggerId),
    /// a stale trigger of an alarm that no longer exists
    UnknownAlarm(AlarmId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// the alarm rings, hand the cue to the sound player
    Ringing(SoundCue),
    Snoozed {
        alarm_id: AlarmId,
        transition: SnoozeTransition,
    },
    Stopped {
        alarm_id: AlarmId,
        transition: SnoozeTransition,
    },
    Ignored(IgnoreReason),
}

#[derive(Debug)]
pub struct AlarmClock<B> {
    store: AlarmStore,
    scheduler: AlarmScheduler<B>,
    snooze: SnoozeMachine,
}

impl<B: TriggerBackend> AlarmClock<B> {
    pub fn new(store: AlarmStore, backend: B, settings: SnoozeSettings) -> Self {
        Self {
            store,
            scheduler: AlarmScheduler::new(backend),
            snooze: SnoozeMachine::new(settings),
        }
    }

    pub const fn store(&self) -> &AlarmStore {
        &self.store
    }

    pub const fn backend(&self) -> &B {
        self.scheduler.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.scheduler.backend_mut()
    }

    pub fn into_backend(self) -> B {
        self.scheduler.into_backend()
    }

    pub fn snooze_state(&self, id: &AlarmId) -> SnoozeState {
        self.snooze.state(id)
    }

    pub fn create_alarm(&mut self, alarm: Alarm) -> Result<()> {
        let event = self.store.create(alarm)?;
        self.commit(&event)
    }

    pub fn update_alarm(&mut self, alarm: Alarm) -> Result<()> {
        let event = self.store.update(alarm)?;
        self.commit(&event)
    }

    pub fn delete_alarm(&mut self, id: &AlarmId) -> Result<()> {
        let event = self.store.delete(id)?;
        self.commit(&event)
    }

    pub fn set_enabled(&mut self, id: &AlarmId, enabled: bool) -> Result<()> {
        let event = self.store.set_enabled(id, enabled)?;
        self.commit(&event)
    }

    /// Brings the backend in line with a store mutation and saves the store.
    ///
    /// The record stays as the user left it even if scheduling failed.
    fn commit(&mut self, event: &AlarmEvent) -> Result<()> {
        let scheduled = self.scheduler.apply(event);
        // a deleted record takes its snooze with it, a disabled one only
        // once the snooze trigger is really gone
        let snooze_cleared = match event {
            AlarmEvent::Deleted(_) => true,
            AlarmEvent::Toggled(alarm) => !alarm.enabled && scheduled.is_ok(),
            AlarmEvent::Created(_) | AlarmEvent::Updated { .. } => false,
        };
        if snooze_cleared {
            self.snooze.alarm_deleted(event.alarm_id());
        }
        self.store.persist()?;
        Ok(scheduled?)
    }

    /// Rebuilds every trigger from the store, after the backend lost them.
    pub fn reconcile(&mut self) -> Result<usize, SchedulingFailure> {
        let result = self.scheduler.reconcile(self.store.alarms());
        if !matches!(result, Err(SchedulingFailure::Reset(_))) {
            // the sweep cleared pending snoozes along with everything else
            self.snooze.reset();
        }
        if let Ok(count) = result {
            info!("reconciled {count} alarm triggers");
        }
        result
    }

    /// swaps in a freshly loaded store and reconciles against it
    pub fn reload(&mut self, store: AlarmStore) -> Result<usize, SchedulingFailure> {
        self.store = store;
        self.reconcile()
    }

    /// Handles a trigger the backend delivered, with what the user did.
    ///
    /// Triggers of alarms that no longer exist are ignored, which makes a
    /// postpone racing a delete a no-op.
    pub fn on_trigger_fired(
        &mut self,
        id: &TriggerId,
        payload: &RawPayload,
        action: UserAction,
    ) -> Result<FireOutcome, SchedulingFailure> {
        let Some((kind, alarm_id)) = id.parse() else {
            warn!("ignoring foreign trigger {id}");
            return Ok(FireOutcome::Ignored(IgnoreReason::ForeignTrigger(
                id.clone(),
            )));
        };
        if !self.store.contains(&alarm_id) {
            warn!("ignoring stale trigger {id}, alarm {alarm_id} is gone");
            return Ok(FireOutcome::Ignored(IgnoreReason::UnknownAlarm(alarm_id)));
        }

        let mut payload = Payload::decode(payload);
        if payload.alarm_id != alarm_id {
            if !payload.alarm_id.is_empty() {
                warn!(
                    "trigger {id} carries alarm id {}, using the identifier's",
                    payload.alarm_id
                );
            }
            payload.alarm_id = alarm_id.clone();
        }

        match action {
            UserAction::None => {
                if kind == TriggerKind::Snooze {
                    self.snooze.snooze_fired(&alarm_id);
                }
                info!("alarm {alarm_id} fired ({id})");
                Ok(FireOutcome::Ringing(SoundCue::new(alarm_id, &payload, kind)))
            }
            UserAction::Postpone => {
                let transition = self
                    .snooze
                    .postpone(self.scheduler.backend_mut(), &payload)?;
                Ok(FireOutcome::Snoozed {
                    alarm_id,
                    transition,
                })
            }
            UserAction::Stop => {
                let transition = self.snooze.stop(self.scheduler.backend_mut(), &alarm_id)?;
                Ok(FireOutcome::Stopped {
                    alarm_id,
                    transition,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{BackendError, MemoryBackend},
        error::Error,
    };

    fn clock() -> AlarmClock<MemoryBackend> {
        AlarmClock::new(
            AlarmStore::new(),
            MemoryBackend::new(),
            SnoozeSettings::default(),
        )
    }

    fn alarm() -> Alarm {
        Alarm::at(7, 0).unwrap().with_id("X")
    }

    #[test]
    fn scheduling_failure_keeps_the_record() {
        let mut clock = clock();
        clock
            .backend_mut()
            .fail_with(Some(BackendError::PermissionDenied));
        let err = clock.create_alarm(alarm()).unwrap_err();
        assert!(matches!(err, Error::Scheduling(SchedulingFailure::Schedule { .. })));
        let stored = clock.store().get(&"X".into()).unwrap();
        assert!(stored.enabled);
    }

    #[test]
    fn failed_update_and_toggle_keep_the_new_record() {
        let mut clock = clock();
        clock.create_alarm(alarm()).unwrap();
        clock
            .backend_mut()
            .fail_with(Some(BackendError::PermissionDenied));

        let later = Alarm::at(7, 30).unwrap().with_id("X");
        let err = clock.update_alarm(later).unwrap_err();
        assert!(matches!(err, Error::Scheduling(_)));
        assert_eq!(clock.store().get(&"X".into()).unwrap().minute(), 30);

        let err = clock.set_enabled(&"X".into(), false).unwrap_err();
        assert!(matches!(err, Error::Scheduling(_)));
        let stored = clock.store().get(&"X".into()).unwrap();
        assert!(!stored.enabled);
        assert_eq!(stored.minute(), 30);
    }

    #[test]
    fn failed_delete_still_forgets_the_snooze() {
        let mut clock = clock();
        clock.create_alarm(alarm()).unwrap();
        let id = TriggerId::primary(&"X".into());
        let payload = Payload::from(&alarm()).encode();
        clock
            .on_trigger_fired(&id, &payload, UserAction::Postpone)
            .unwrap();

        clock
            .backend_mut()
            .fail_with(Some(BackendError::Unavailable));
        assert!(clock.delete_alarm(&"X".into()).is_err());
        assert_eq!(clock.snooze_state(&"X".into()), SnoozeState::Idle);

        // the same id again starts from scratch
        clock.backend_mut().fail_with(None);
        clock.create_alarm(alarm()).unwrap();
        let outcome = clock
            .on_trigger_fired(&id, &payload, UserAction::Postpone)
            .unwrap();
        assert_eq!(
            outcome,
            FireOutcome::Snoozed {
                alarm_id: "X".into(),
                transition: SnoozeTransition::Snoozed { minutes: 5 },
            }
        );
    }

    #[test]
    fn alarm_without_id_is_refused() {
        let mut clock = clock();
        let err = clock
            .create_alarm(Alarm::at(7, 0).unwrap().with_id(""))
            .unwrap_err();
        assert!(matches!(err, Error::Store(crate::error::StoreError::EmptyId)));
        assert!(clock.backend().calls().is_empty());
    }

    #[test]
    fn foreign_trigger_is_ignored() {
        let mut clock = clock();
        let id = TriggerId::from_raw("calendar-42");
        let outcome = clock
            .on_trigger_fired(&id, &RawPayload::default(), UserAction::Postpone)
            .unwrap();
        assert_eq!(outcome, FireOutcome::Ignored(IgnoreReason::ForeignTrigger(id)));
        assert!(clock.backend().calls().is_empty());
    }

    #[test]
    fn payload_without_id_uses_the_identifier() {
        let mut clock = clock();
        clock.create_alarm(alarm()).unwrap();
        let id = TriggerId::primary(&"X".into());
        let outcome = clock
            .on_trigger_fired(&id, &RawPayload::default(), UserAction::None)
            .unwrap();
        let cue = match outcome {
            FireOutcome::Ringing(cue) => cue,
            other => panic!("expected the alarm to ring, got {other:?}"),
        };
        assert_eq!(cue.alarm_id, AlarmId::new("X"));
        assert_eq!(cue.body, crate::alarm::DEFAULT_LABEL);
    }

    #[test]
    fn disabling_forgets_the_snooze() {
        let mut clock = clock();
        clock.create_alarm(alarm()).unwrap();
        let id = TriggerId::primary(&"X".into());
        let payload = Payload::from(&alarm()).encode();
        clock
            .on_trigger_fired(&id, &payload, UserAction::Postpone)
            .unwrap();
        assert_eq!(
            clock.snooze_state(&"X".into()),
            SnoozeState::Snoozed { minutes: 5 }
        );
        clock.set_enabled(&"X".into(), false).unwrap();
        assert_eq!(clock.snooze_state(&"X".into()), SnoozeState::Idle);
        assert!(clock.backend().pending().is_empty());
    }

    #[test]
    fn reconcile_restores_lost_triggers() {
        let mut clock = clock();
        clock.create_alarm(alarm()).unwrap();
        clock
            .create_alarm(Alarm::at(8, 0).unwrap().with_id("Y").with_enabled(false))
            .unwrap();
        // the backend forgot everything
        *clock.backend_mut() = MemoryBackend::new();
        assert_eq!(clock.reconcile().unwrap(), 1);
        assert!(clock.backend().is_pending(&TriggerId::primary(&"X".into())));
    }
}
