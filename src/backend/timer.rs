//! A backend that fires triggers from a worker thread.
//!
//! Calls are forwarded to the worker over a channel and return as soon as
//! the command is queued. The worker sleeps until the earliest pending
//! trigger is due, or a command arrives, and sends fired triggers out on
//! the channel returned by [`TimerBackend::spawn`].

use std::{collections::HashMap, thread, time::Duration};

use chrono::NaiveDateTime;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use super::{BackendError, FiredTrigger, TriggerBackend};
use crate::trigger::{Trigger, TriggerId};

/// longest the worker sleeps before looking at the wall clock again,
/// so suspends and clock changes are noticed
const MAX_WAIT: Duration = Duration::from_secs(30);

pub type WallClock = Box<dyn Fn() -> NaiveDateTime + Send>;

#[derive(Debug)]
enum Command {
    Schedule(Trigger),
    Cancel(TriggerId),
    CancelAll,
}

#[derive(Debug)]
pub struct TimerBackend {
    commands: Sender<Command>,
    worker: thread::JoinHandle<()>,
}

impl TimerBackend {
    /// starts the worker on the local wall clock
    #[must_use]
    pub fn spawn() -> (Self, Receiver<FiredTrigger>) {
        Self::with_clock(
            Box::new(|| chrono::Local::now().naive_local()),
            MAX_WAIT,
        )
    }

    /// starts the worker on `clock`, waking up at least every `max_wait`
    #[must_use]
    pub fn with_clock(clock: WallClock, max_wait: Duration) -> (Self, Receiver<FiredTrigger>) {
        let (commands, command_rx) = crossbeam_channel::unbounded();
        let (fired_tx, fired) = crossbeam_channel::unbounded();
        let worker = Worker {
            armed: HashMap::new(),
            fired: fired_tx,
            clock,
            max_wait,
        };
        let handle = thread::spawn(move || worker.run(&command_rx));
        (
            Self {
                commands,
                worker: handle,
            },
            fired,
        )
    }

    /// stops the worker, dropping every pending trigger
    pub fn shutdown(self) {
        let Self { commands, worker } = self;
        // dropping the only sender disconnects the worker
        drop(commands);
        if worker.join().is_err() {
            warn!("timer worker panicked");
        }
    }

    fn send(&self, command: Command) -> Result<(), BackendError> {
        self.commands
            .send(command)
            .map_err(|_| BackendError::Unavailable)
    }
}

impl TriggerBackend for TimerBackend {
    fn schedule(&mut self, trigger: Trigger) -> Result<(), BackendError> {
        if !trigger.recurrence.is_valid() {
            return Err(BackendError::Rejected(format!(
                "{} never fires ({})",
                trigger.id, trigger.recurrence
            )));
        }
        self.send(Command::Schedule(trigger))
    }

    fn cancel(&mut self, id: &TriggerId) -> Result<(), BackendError> {
        self.send(Command::Cancel(id.clone()))
    }

    fn cancel_all(&mut self) -> Result<(), BackendError> {
        self.send(Command::CancelAll)
    }
}

struct Armed {
    trigger: Trigger,
    next: NaiveDateTime,
}

struct Worker {
    armed: HashMap<TriggerId, Armed>,
    fired: Sender<FiredTrigger>,
    clock: WallClock,
    max_wait: Duration,
}

impl Worker {
    fn run(mut self, commands: &Receiver<Command>) {
        info!("timer backend started");
        loop {
            let now = (self.clock)();
            self.fire_due(now);
            let wait = self
                .armed
                .values()
                .map(|armed| armed.next)
                .min()
                .and_then(|next| (next - now).to_std().ok())
                .map_or(self.max_wait, |until| until.min(self.max_wait));
            match commands.recv_timeout(wait) {
                Ok(command) => self.apply(command, (self.clock)()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("timer backend stopped with {} pending triggers", self.armed.len());
    }

    fn apply(&mut self, command: Command, now: NaiveDateTime) {
        match command {
            Command::Schedule(trigger) => {
                let Some(next) = trigger.recurrence.next_fire(now) else {
                    warn!("dropping {}, it never fires", trigger.id);
                    return;
                };
                debug!("armed {} for {next}", trigger.id);
                self.armed
                    .insert(trigger.id.clone(), Armed { trigger, next });
            }
            Command::Cancel(id) => {
                if self.armed.remove(&id).is_some() {
                    debug!("disarmed {id}");
                }
            }
            Command::CancelAll => self.armed.clear(),
        }
    }

    fn fire_due(&mut self, now: NaiveDateTime) {
        let due: Vec<TriggerId> = self
            .armed
            .iter()
            .filter(|(_, armed)| armed.next <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in due {
            let Some(armed) = self.armed.get_mut(&id) else {
                continue;
            };
            info!("firing {id}");
            if self
                .fired
                .send(FiredTrigger {
                    id: id.clone(),
                    payload: armed.trigger.payload.clone(),
                })
                .is_err()
            {
                warn!("nobody is listening for {id}");
            }
            match armed.trigger.recurrence.next_fire(now) {
                Some(next) if armed.trigger.recurrence.repeats() => armed.next = next,
                _ => {
                    self.armed.remove(&id);
                }
            }
        }
    }
}
