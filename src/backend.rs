//! The capability that delivers triggers at wall-clock times.
//!
//! Anything that can schedule a trigger with a recurrence, cancel it by
//! identifier and hand back the payload when it fires can drive the
//! scheduler: an OS notification service, a timer thread, a delayed queue.

use crate::{
    payload::RawPayload,
    trigger::{Trigger, TriggerId},
};

pub mod memory;
pub mod timer;

pub use memory::MemoryBackend;
pub use timer::TimerBackend;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("trigger backend is not running")]
    Unavailable,
    #[error("not permitted to schedule triggers")]
    PermissionDenied,
    #[error("trigger rejected: {0}")]
    Rejected(String),
}

pub trait TriggerBackend {
    /// Registers `trigger`, replacing a pending one with the same identifier
    /// when [`upserts`](Self::upserts) is true.
    fn schedule(&mut self, trigger: Trigger) -> Result<(), BackendError>;

    /// Removes the pending trigger `id`. Cancelling nothing is not an error.
    fn cancel(&mut self, id: &TriggerId) -> Result<(), BackendError>;

    /// Removes every pending trigger, used before a reconciliation sweep.
    fn cancel_all(&mut self) -> Result<(), BackendError>;

    /// Whether scheduling an existing identifier replaces it. Backends that
    /// append get an explicit cancel first.
    fn upserts(&self) -> bool {
        true
    }
}

impl<B: TriggerBackend + ?Sized> TriggerBackend for Box<B> {
    fn schedule(&mut self, trigger: Trigger) -> Result<(), BackendError> {
        (**self).schedule(trigger)
    }

    fn cancel(&mut self, id: &TriggerId) -> Result<(), BackendError> {
        (**self).cancel(id)
    }

    fn cancel_all(&mut self) -> Result<(), BackendError> {
        (**self).cancel_all()
    }

    fn upserts(&self) -> bool {
        (**self).upserts()
    }
}

/// what the user did with a delivered trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserAction {
    /// the trigger was just delivered
    #[default]
    None,
    Postpone,
    Stop,
}

/// A trigger delivered by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTrigger {
    pub id: TriggerId,
    pub payload: RawPayload,
}
