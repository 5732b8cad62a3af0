//! The snooze state machine.
//!
//! ```text
//!            postpone                    stop / alarm deleted
//!   Idle ─────────────────► Snoozed ─────────────────────────► Idle
//!                           │     ▲
//!                           └─────┘
//!                       postpone (overwrites)
//! ```
//!
//! At most one snooze trigger is pending per alarm: postponing again
//! schedules under the same identifier, which replaces the previous one.
//! The state kept here mirrors what was asked of the backend; `stop` always
//! cancels so a snooze scheduled before a restart is still cleared.

use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{AlarmId, SNOOZE_RANGE},
    backend::TriggerBackend,
    error::SchedulingFailure,
    payload::Payload,
    scheduler::{cancel, schedule},
    trigger::{Trigger, TriggerId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnoozeSettings {
    /// used when a payload doesn't carry the alarm's snooze length
    pub default_minutes: u32,
    /// Keep ringing every interval until stopped. When off, a snooze fires
    /// once and has to be postponed again explicitly.
    pub repeat: bool,
}

impl Default for SnoozeSettings {
    fn default() -> Self {
        Self {
            default_minutes: 5,
            repeat: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeState {
    Idle,
    Snoozed { minutes: u32 },
}

/// what a snooze event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeTransition {
    /// Idle to Snoozed
    Snoozed { minutes: u32 },
    /// postponed while already snoozed, the pending trigger was replaced
    Resnoozed { minutes: u32 },
    /// Snoozed to Idle
    Stopped,
    /// stop without a known pending snooze
    AlreadyIdle,
}

#[derive(Debug, Default)]
pub struct SnoozeMachine {
    settings: SnoozeSettings,
    snoozed: HashMap<AlarmId, u32>,
}

impl SnoozeMachine {
    #[must_use]
    pub fn new(settings: SnoozeSettings) -> Self {
        Self {
            settings,
            snoozed: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SnoozeSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self, id: &AlarmId) -> SnoozeState {
        self.snoozed
            .get(id)
            .map_or(SnoozeState::Idle, |&minutes| SnoozeState::Snoozed { minutes })
    }

    /// snooze length for a payload, clamped to what an alarm may configure
    #[must_use]
    pub fn minutes_for(&self, payload: &Payload) -> u32 {
        payload
            .snooze_minutes
            .unwrap_or(self.settings.default_minutes)
            .clamp(*SNOOZE_RANGE.start(), *SNOOZE_RANGE.end())
    }

    /// Arms the snooze trigger for the alarm in `payload`.
    ///
    /// Works from the payload alone, the alarm record may have changed
    /// since the trigger was scheduled.
    pub fn postpone<B: TriggerBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        payload: &Payload,
    ) -> Result<SnoozeTransition, SchedulingFailure> {
        let minutes = self.minutes_for(payload);
        schedule(
            backend,
            Trigger::snooze(payload, minutes, self.settings.repeat),
        )?;
        let transition = match self.snoozed.insert(payload.alarm_id.clone(), minutes) {
            Some(_) => SnoozeTransition::Resnoozed { minutes },
            None => SnoozeTransition::Snoozed { minutes },
        };
        info!("alarm {} snoozed for {minutes} minutes", payload.alarm_id);
        Ok(transition)
    }

    /// Cancels the snooze trigger of `id`. Stopping an idle alarm is fine.
    pub fn stop<B: TriggerBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: &AlarmId,
    ) -> Result<SnoozeTransition, SchedulingFailure> {
        cancel(backend, &TriggerId::snooze(id))?;
        Ok(match self.snoozed.remove(id) {
            Some(_) => {
                info!("alarm {id} stopped");
                SnoozeTransition::Stopped
            }
            None => SnoozeTransition::AlreadyIdle,
        })
    }

    /// the scheduler already cancelled the trigger, only forget it
    pub fn alarm_deleted(&mut self, id: &AlarmId) {
        self.snoozed.remove(id);
    }

    /// a snooze trigger fired; one shot snoozes are gone from the backend now
    pub fn snooze_fired(&mut self, id: &AlarmId) {
        if !self.settings.repeat && self.snoozed.remove(id).is_some() {
            debug!("one shot snooze of alarm {id} fired");
        }
    }

    /// forget every snooze, after the backend was cleared
    pub fn reset(&mut self) {
        self.snoozed.clear();
    }
}
