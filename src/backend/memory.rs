use std::collections::BTreeMap;

use log::debug;

use super::{BackendError, FiredTrigger, TriggerBackend};
use crate::trigger::{Trigger, TriggerId};

/// one call received by a [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Schedule(Trigger),
    Cancel(TriggerId),
    CancelAll,
}

/// Keeps pending triggers in memory and records every call.
///
/// Nothing fires on its own, [`fire`](Self::fire) simulates delivery.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    pending: BTreeMap<TriggerId, Trigger>,
    calls: Vec<BackendCall>,
    failure: Option<BackendError>,
    cancel_failure: Option<BackendError>,
    append_only: bool,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// a backend that does not replace triggers scheduled under an existing id
    #[must_use]
    pub fn append_only() -> Self {
        Self {
            append_only: true,
            ..Self::default()
        }
    }

    /// makes every following call fail with `error`, `None` heals it
    pub fn fail_with(&mut self, error: Option<BackendError>) {
        self.failure = error;
    }

    /// like [`fail_with`](Self::fail_with), for cancel calls only
    pub fn fail_cancels_with(&mut self, error: Option<BackendError>) {
        self.cancel_failure = error;
    }

    #[must_use]
    pub fn pending(&self) -> Vec<&Trigger> {
        self.pending.values().collect()
    }

    #[must_use]
    pub fn get(&self, id: &TriggerId) -> Option<&Trigger> {
        self.pending.get(id)
    }

    #[must_use]
    pub fn is_pending(&self, id: &TriggerId) -> bool {
        self.pending.contains_key(id)
    }

    #[must_use]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// the calls recorded so far, leaving the log empty
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Delivers the pending trigger `id` as if its time had come.
    ///
    /// Triggers that do not repeat are removed, like a real backend would.
    pub fn fire(&mut self, id: &TriggerId) -> Option<FiredTrigger> {
        let trigger = self.pending.get(id)?;
        let fired = FiredTrigger {
            id: trigger.id.clone(),
            payload: trigger.payload.clone(),
        };
        if !trigger.recurrence.repeats() {
            self.pending.remove(id);
        }
        Some(fired)
    }

    fn check(&self) -> Result<(), BackendError> {
        self.failure.clone().map_or(Ok(()), Err)
    }
}

impl TriggerBackend for MemoryBackend {
    fn schedule(&mut self, trigger: Trigger) -> Result<(), BackendError> {
        self.check()?;
        debug!("schedule {} {}", trigger.id, trigger.recurrence);
        self.calls.push(BackendCall::Schedule(trigger.clone()));
        if self.append_only && self.pending.contains_key(&trigger.id) {
            return Err(BackendError::Rejected(format!(
                "{} is already pending",
                trigger.id
            )));
        }
        self.pending.insert(trigger.id.clone(), trigger);
        Ok(())
    }

    fn cancel(&mut self, id: &TriggerId) -> Result<(), BackendError> {
        self.check()?;
        if let Some(error) = self.cancel_failure.clone() {
            return Err(error);
        }
        debug!("cancel {id}");
        self.calls.push(BackendCall::Cancel(id.clone()));
        self.pending.remove(id);
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), BackendError> {
        self.check()?;
        debug!("cancel all {} pending triggers", self.pending.len());
        self.calls.push(BackendCall::CancelAll);
        self.pending.clear();
        Ok(())
    }

    fn upserts(&self) -> bool {
        !self.append_only
    }
}
