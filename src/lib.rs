#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Daily alarms with snooze, scheduled through a pluggable trigger backend.
//!
//! Alarms live in an [`AlarmStore`]. Every mutation is turned into schedule
//! and cancel calls on a [`TriggerBackend`] by the [`AlarmScheduler`], and
//! postpone/stop actions on a fired trigger are handled by the
//! [`SnoozeMachine`]. [`AlarmClock`] ties them together behind a single
//! `&mut self`.

pub mod alarm;
pub mod backend;
pub mod clock;
pub mod communication;
pub mod config;
pub mod error;
pub mod payload;
pub mod playback;
pub mod scheduler;
pub mod snooze;
pub mod store;
pub mod trigger;

pub use alarm::{Alarm, AlarmId, Sound};
pub use backend::{BackendError, FiredTrigger, TriggerBackend, UserAction};
pub use clock::{AlarmClock, FireOutcome, IgnoreReason};
pub use config::Config;
pub use error::{ConfigError, Error, SchedulingFailure, StoreError};
pub use payload::{Payload, RawPayload};
pub use scheduler::AlarmScheduler;
pub use snooze::{SnoozeMachine, SnoozeSettings, SnoozeState, SnoozeTransition};
pub use store::{AlarmEvent, AlarmStore};
pub use trigger::{Recurrence, Trigger, TriggerId, TriggerKind};
