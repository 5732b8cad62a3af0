//! Triggers: the time based events an alarm is turned into.
//!
//! A trigger is identified by a string derived only from the alarm id and
//! the trigger kind, so a cancel issued after a restart still matches a
//! trigger that was scheduled before it.

use std::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::{
    alarm::{Alarm, AlarmId},
    payload::{Payload, RawPayload},
};

const PRIMARY_PREFIX: &str = "alarm-";
const SNOOZE_PREFIX: &str = "snoozedAlarm-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// fires every day at the alarm's time
    Primary,
    /// fires after the alarm was postponed
    Snooze,
}

impl TriggerKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_PREFIX,
            Self::Snooze => SNOOZE_PREFIX,
        }
    }
}

/// Deterministic identifier of a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(String);

impl TriggerId {
    #[must_use]
    pub fn new(kind: TriggerKind, alarm: &AlarmId) -> Self {
        Self(format!("{}{alarm}", kind.prefix()))
    }

    #[must_use]
    pub fn primary(alarm: &AlarmId) -> Self {
        Self::new(TriggerKind::Primary, alarm)
    }

    #[must_use]
    pub fn snooze(alarm: &AlarmId) -> Self {
        Self::new(TriggerKind::Snooze, alarm)
    }

    /// wraps an identifier handed back by a backend
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recovers the kind and alarm id.
    ///
    /// Returns `None` for identifiers this crate did not produce.
    #[must_use]
    pub fn parse(&self) -> Option<(TriggerKind, AlarmId)> {
        // the snooze prefix does not start with the primary one, order is irrelevant
        [TriggerKind::Primary, TriggerKind::Snooze]
            .into_iter()
            .find_map(|kind| {
                self.0
                    .strip_prefix(kind.prefix())
                    .filter(|id| !id.is_empty())
                    .map(|id| (kind, AlarmId::new(id)))
            })
    }

    #[must_use]
    pub fn kind(&self) -> Option<TriggerKind> {
        self.parse().map(|(kind, _)| kind)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When a trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// every day when the wall clock matches `hour:minute`
    Daily { hour: u32, minute: u32 },
    /// `minutes` after being armed, then again every `minutes` if `repeats`
    Interval { minutes: u32, repeats: bool },
}

impl Recurrence {
    #[must_use]
    pub fn daily_at(alarm: &Alarm) -> Self {
        Self::Daily {
            hour: alarm.hour(),
            minute: alarm.minute(),
        }
    }

    /// The first firing strictly after `after`.
    ///
    /// For daily recurrences that is today's `hour:minute` if it is still
    /// ahead, otherwise tomorrow's. Intervals are counted from `after`.
    #[must_use]
    pub fn next_fire(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Self::Daily { hour, minute } => {
                let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                let today = after.date().and_time(time);
                if today > after {
                    Some(today)
                } else {
                    after.date().succ_opt().map(|date| date.and_time(time))
                }
            }
            Self::Interval { minutes, .. } => {
                Some(after + Duration::minutes(i64::from(minutes.max(1))))
            }
        }
    }

    /// whether the recurrence describes a time that can ever be reached
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        match *self {
            Self::Daily { hour, minute } => hour < 24 && minute < 60,
            Self::Interval { minutes, .. } => minutes > 0,
        }
    }

    /// whether the trigger stays pending after it fired
    #[must_use]
    pub const fn repeats(&self) -> bool {
        match self {
            Self::Daily { .. } => true,
            Self::Interval { repeats, .. } => *repeats,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { hour, minute } => write!(f, "daily@{hour:02}:{minute:02}"),
            Self::Interval {
                minutes,
                repeats: true,
            } => write!(f, "every-{minutes}-min"),
            Self::Interval {
                minutes,
                repeats: false,
            } => write!(f, "once-in-{minutes}-min"),
        }
    }
}

/// which actions are offered to the user when the trigger is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// snooze and stop
    Snoozable,
    /// stop only
    StopOnly,
}

/// what the backend shows when delivering the trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub category: Category,
}

/// A request for the backend to deliver `payload` according to `recurrence`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub id: TriggerId,
    pub recurrence: Recurrence,
    pub notice: Notice,
    pub payload: RawPayload,
}

impl Trigger {
    /// the daily trigger realizing an enabled alarm
    #[must_use]
    pub fn primary(alarm: &Alarm) -> Self {
        let payload = Payload::from(alarm);
        Self {
            id: TriggerId::primary(&alarm.id),
            recurrence: Recurrence::daily_at(alarm),
            notice: Notice {
                title: "Alarm".to_string(),
                body: alarm.display_label().to_string(),
                category: if alarm.snooze {
                    Category::Snoozable
                } else {
                    Category::StopOnly
                },
            },
            payload: payload.encode(),
        }
    }

    /// the follow up trigger of a postponed alarm
    #[must_use]
    pub fn snooze(payload: &Payload, minutes: u32, repeats: bool) -> Self {
        Self {
            id: TriggerId::snooze(&payload.alarm_id),
            recurrence: Recurrence::Interval { minutes, repeats },
            notice: Notice {
                title: "Snoozed Alarm".to_string(),
                body: payload.display_label().to_string(),
                category: Category::Snoozable,
            },
            payload: payload.encode(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<TriggerKind> {
        self.id.kind()
    }
}
