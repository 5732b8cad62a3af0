//! The authoritative set of alarms.
//!
//! Every successful mutation returns the [`AlarmEvent`] the scheduler needs
//! to bring the trigger backend in line with it.

use std::{collections::HashMap, hash::Hash, path::PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{Alarm, AlarmId, SNOOZE_RANGE},
    error::StoreError,
};

pub trait GetId<T> {
    fn get_id(&self) -> &T;
}

impl GetId<AlarmId> for Alarm {
    fn get_id(&self) -> &AlarmId {
        &self.id
    }
}

/// A map keyed by the items' own ids that serializes as a plain list.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(from = "Vec<V>", into = "Vec<V>")]
pub struct Collection<K, V>
where
    K: Eq + Hash + Clone,
    V: GetId<K> + Clone,
{
    pub data: HashMap<K, V>,
}

impl<K, V> Default for Collection<K, V>
where
    K: Eq + Hash + Clone,
    V: GetId<K> + Clone,
{
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<K, V> Collection<K, V>
where
    K: Eq + Hash + Clone,
    V: GetId<K> + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: V) -> Option<V> {
        let id = item.get_id().to_owned();
        self.data.insert(id, item)
    }
}

impl<K, V> From<Vec<V>> for Collection<K, V>
where
    K: Eq + Hash + Clone,
    V: GetId<K> + Clone,
{
    fn from(value: Vec<V>) -> Self {
        let mut obj: Self = Self::new();
        let duplicates = value
            .into_iter()
            .filter_map(|v| obj.insert(v))
            .count();
        if duplicates > 0 {
            warn!("{duplicates} entries share an id with a later one and were dropped");
        }
        obj
    }
}

impl<K, V> From<Collection<K, V>> for Vec<V>
where
    K: Eq + Hash + Clone,
    V: GetId<K> + Clone,
{
    fn from(val: Collection<K, V>) -> Self {
        Self::from_iter(val.data.into_values())
    }
}

/// on-disk layout of the alarms file
#[derive(Debug, Default, Serialize, Deserialize)]
struct AlarmsFile {
    #[serde(default)]
    alarms: Collection<AlarmId, Alarm>,
}

/// A store mutation, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    Created(Alarm),
    Updated { old: Alarm, new: Alarm },
    Deleted(Alarm),
    /// only the enabled flag changed, the alarm carries the new value
    Toggled(Alarm),
}

impl AlarmEvent {
    #[must_use]
    pub const fn alarm_id(&self) -> &AlarmId {
        match self {
            Self::Created(alarm) | Self::Deleted(alarm) | Self::Toggled(alarm) => &alarm.id,
            Self::Updated { new, .. } => &new.id,
        }
    }
}

#[derive(Debug, Default)]
pub struct AlarmStore {
    alarms: Collection<AlarmId, Alarm>,
    path: Option<PathBuf>,
}

impl AlarmStore {
    /// a store that only lives in memory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the alarms file at `path`, starting empty if it doesn't exist.
    ///
    /// Changes are written back by [`persist`](Self::persist).
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let alarms = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<AlarmsFile>(&text)?.alarms
        } else {
            Collection::new()
        };
        info!("loaded {} alarms from {}", alarms.data.len(), path.display());
        Ok(Self {
            alarms,
            path: Some(path),
        })
    }

    /// writes the alarms file, a no-op for in-memory stores
    pub fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = AlarmsFile {
            alarms: self.alarms.clone(),
        };
        let text = toml::to_string(&file)?;
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, text).map_err(io_error)?;
        debug!("saved {} alarms to {}", self.alarms.data.len(), path.display());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &AlarmId) -> Option<&Alarm> {
        self.alarms.data.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &AlarmId) -> bool {
        self.alarms.data.contains_key(id)
    }

    /// all alarms ordered by time of day, then id
    #[must_use]
    pub fn alarms(&self) -> Vec<&Alarm> {
        let mut alarms: Vec<&Alarm> = self.alarms.data.values().collect();
        alarms.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        alarms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.data.is_empty()
    }

    pub fn create(&mut self, alarm: Alarm) -> Result<AlarmEvent, StoreError> {
        validate(&alarm)?;
        if self.contains(&alarm.id) {
            return Err(StoreError::DuplicateAlarm(alarm.id));
        }
        info!("created alarm {alarm}");
        self.alarms.insert(alarm.clone());
        Ok(AlarmEvent::Created(alarm))
    }

    /// replaces the alarm with the same id
    pub fn update(&mut self, alarm: Alarm) -> Result<AlarmEvent, StoreError> {
        validate(&alarm)?;
        let old = self
            .alarms
            .data
            .get_mut(&alarm.id)
            .ok_or_else(|| StoreError::UnknownAlarm(alarm.id.clone()))?;
        let old = std::mem::replace(old, alarm.clone());
        info!("updated alarm {old} to {alarm}");
        Ok(AlarmEvent::Updated { old, new: alarm })
    }

    pub fn delete(&mut self, id: &AlarmId) -> Result<AlarmEvent, StoreError> {
        let alarm = self
            .alarms
            .data
            .remove(id)
            .ok_or_else(|| StoreError::UnknownAlarm(id.clone()))?;
        info!("deleted alarm {alarm}");
        Ok(AlarmEvent::Deleted(alarm))
    }

    pub fn set_enabled(&mut self, id: &AlarmId, enabled: bool) -> Result<AlarmEvent, StoreError> {
        let alarm = self
            .alarms
            .data
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownAlarm(id.clone()))?;
        alarm.enabled = enabled;
        info!("{} alarm {id}", if enabled { "enabled" } else { "disabled" });
        Ok(AlarmEvent::Toggled(alarm.clone()))
    }
}

fn validate(alarm: &Alarm) -> Result<(), StoreError> {
    // trigger identifiers need a non-empty id to route back to the alarm
    if alarm.id.is_empty() {
        return Err(StoreError::EmptyId);
    }
    if alarm.snooze && !SNOOZE_RANGE.contains(&alarm.snooze_time) {
        return Err(StoreError::InvalidSnoozeTime(alarm.snooze_time));
    }
    Ok(())
}
