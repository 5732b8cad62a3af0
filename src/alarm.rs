use std::{fmt, ops::RangeInclusive, str::FromStr};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// snooze lengths (in minutes) an alarm may be configured with
pub const SNOOZE_RANGE: RangeInclusive<u32> = 1..=30;

/// label shown when an alarm has none
pub const DEFAULT_LABEL: &str = "Time to get up!";

/// Opaque, immutable identity of an alarm.
///
/// Trigger identifiers are derived from it, so it has to survive restarts
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(String);

impl AlarmId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// a fresh random id for a newly created alarm
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlarmId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AlarmId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// the sounds an alarm can ring with
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    #[default]
    Piano,
    Chimes,
}

impl Sound {
    pub const ALL: [Self; 2] = [Self::Piano, Self::Chimes];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Piano => "Piano",
            Self::Chimes => "Chimes",
        }
    }

    /// file name of the sound asset, the ramped variant has its own recording
    #[must_use]
    pub fn file_name(self, slowly_increase_volume: bool) -> String {
        if slowly_increase_volume {
            format!("{}-increasing.wav", self.name())
        } else {
            format!("{}.wav", self.name())
        }
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sound {0:?}")]
pub struct UnknownSound(pub String);

impl FromStr for Sound {
    type Err = UnknownSound;

    /// names are matched case insensitively, older payloads stored "piano"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sound| sound.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSound(s.to_string()))
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[inline]
#[must_use]
pub const fn default_snooze_time() -> u32 {
    5
}

/// represents an alarm
/// rings every day at `time`, only the hour and minute are used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    #[serde(default)]
    pub label: String,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
    #[serde(default = "always_true")]
    pub enabled: bool,
    #[serde(default = "always_true")]
    pub snooze: bool,
    #[serde(default = "default_snooze_time")]
    pub snooze_time: u32,
    #[serde(default)]
    pub sound: Sound,
    #[serde(default)]
    pub slowly_increase_volume: bool,
}

impl Alarm {
    /// a new enabled alarm with a fresh id and the default settings
    #[must_use]
    pub fn new(time: NaiveTime) -> Self {
        Self {
            id: AlarmId::generate(),
            label: String::new(),
            time,
            enabled: true,
            snooze: true,
            snooze_time: default_snooze_time(),
            sound: Sound::default(),
            slowly_increase_volume: false,
        }
    }

    /// builds an alarm for `hour:minute`, `None` if that is not a time of day
    #[must_use]
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self::new)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<AlarmId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_sound(mut self, sound: Sound, slowly_increase_volume: bool) -> Self {
        self.sound = sound;
        self.slowly_increase_volume = slowly_increase_volume;
        self
    }

    /// `None` turns snoozing off
    #[must_use]
    pub fn with_snooze(mut self, minutes: Option<u32>) -> Self {
        match minutes {
            Some(minutes) => {
                self.snooze = true;
                self.snooze_time = minutes;
            }
            None => self.snooze = false,
        }
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// the label, or the default one if it was left empty
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            DEFAULT_LABEL
        } else {
            &self.label
        }
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    /// snooze length to carry with the alarm's triggers, if it may be snoozed
    #[must_use]
    pub const fn snooze_minutes(&self) -> Option<u32> {
        if self.snooze {
            Some(self.snooze_time)
        } else {
            None
        }
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}{}",
            self.time.format("%H:%M"),
            self.display_label(),
            self.sound,
            if self.slowly_increase_volume {
                ", increasing"
            } else {
                ""
            }
        )?;
        match self.snooze_minutes() {
            Some(minutes) => write!(f, ", snooze {minutes} min)")?,
            None => write!(f, ", no snooze)")?,
        }
        if !self.enabled {
            write!(f, " [disabled]")?;
        }
        Ok(())
    }
}
