use std::{io, path::PathBuf};

use crate::{alarm::AlarmId, backend::BackendError, trigger::TriggerId};

/// The backend refused a schedule or cancel call.
///
/// The alarm record is left as it is; the next mutation or reconciliation
/// is the retry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingFailure {
    #[error("couldn't schedule trigger {id}: {source}")]
    Schedule {
        id: TriggerId,
        #[source]
        source: BackendError,
    },
    #[error("couldn't cancel trigger {id}: {source}")]
    Cancel {
        id: TriggerId,
        #[source]
        source: BackendError,
    },
    #[error("couldn't clear pending triggers: {0}")]
    Reset(#[source] BackendError),
}

impl SchedulingFailure {
    /// the trigger the failed call was about, `None` for a reset
    #[must_use]
    pub const fn trigger(&self) -> Option<&TriggerId> {
        match self {
            Self::Schedule { id, .. } | Self::Cancel { id, .. } => Some(id),
            Self::Reset(_) => None,
        }
    }

    #[must_use]
    pub const fn backend_error(&self) -> &BackendError {
        match self {
            Self::Schedule { source, .. } | Self::Cancel { source, .. } | Self::Reset(source) => {
                source
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no alarm with id {0}")]
    UnknownAlarm(AlarmId),
    #[error("an alarm needs a non-empty id")]
    EmptyId,
    #[error("an alarm with id {0} already exists")]
    DuplicateAlarm(AlarmId),
    #[error("snooze time of {0} minutes is outside 1..=30")]
    InvalidSnoozeTime(u32),
    #[error("couldn't access alarms file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse alarms file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize alarms: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("couldn't determine the configuration directory")]
    NoProjectDirs,
    #[error("couldn't access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Scheduling(#[from] SchedulingFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
