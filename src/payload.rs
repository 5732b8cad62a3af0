//! The data a fired trigger carries.
//!
//! Payloads outlive the process that scheduled them, so decoding has to
//! accept whatever an older version wrote: every field is read on its own
//! and falls back to a default when it is missing or has the wrong type.

use std::{fmt, str::FromStr};

use log::warn;
use toml::{Table, Value};

use crate::alarm::{Alarm, AlarmId, Sound, DEFAULT_LABEL, SNOOZE_RANGE};

const ALARM_ID: &str = "alarmId";
const LABEL: &str = "alarmLabel";
const SOUND: &str = "sound";
const SLOWLY_INCREASE_VOLUME: &str = "slowlyIncreaseVolume";
const SNOOZE_MINUTES: &str = "snoozeMinutes";

/// Opaque form of a payload as stored by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload(Table);

impl RawPayload {
    #[must_use]
    pub const fn new(table: Table) -> Self {
        Self(table)
    }

    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.0
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.0
    }
}

impl fmt::Display for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // a table of scalars always serializes
        let text = toml::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for RawPayload {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map(Self)
    }
}

/// Decoded payload of a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub alarm_id: AlarmId,
    pub label: String,
    pub sound: Sound,
    pub slowly_increase_volume: bool,
    /// snooze length of the alarm when it was scheduled, if it allowed snoozing
    pub snooze_minutes: Option<u32>,
}

impl From<&Alarm> for Payload {
    fn from(alarm: &Alarm) -> Self {
        Self {
            alarm_id: alarm.id.clone(),
            label: alarm.label.clone(),
            sound: alarm.sound,
            slowly_increase_volume: alarm.slowly_increase_volume,
            snooze_minutes: alarm.snooze_minutes(),
        }
    }
}

impl Payload {
    #[must_use]
    pub fn encode(&self) -> RawPayload {
        let mut table = Table::new();
        table.insert(ALARM_ID.into(), Value::String(self.alarm_id.to_string()));
        table.insert(LABEL.into(), Value::String(self.label.clone()));
        table.insert(SOUND.into(), Value::String(self.sound.name().to_string()));
        table.insert(
            SLOWLY_INCREASE_VOLUME.into(),
            Value::Boolean(self.slowly_increase_volume),
        );
        if let Some(minutes) = self.snooze_minutes {
            table.insert(SNOOZE_MINUTES.into(), Value::Integer(i64::from(minutes)));
        }
        RawPayload(table)
    }

    /// Never fails, malformed fields are replaced with their defaults.
    ///
    /// A missing alarm id decodes to an empty one; callers that know the
    /// trigger identifier should prefer the id it carries.
    #[must_use]
    pub fn decode(raw: &RawPayload) -> Self {
        let table = raw.table();

        let alarm_id = field(table, ALARM_ID, Value::as_str)
            .map(AlarmId::new)
            .unwrap_or_default();

        let label = field(table, LABEL, Value::as_str)
            .unwrap_or(DEFAULT_LABEL)
            .to_string();

        let sound = field(table, SOUND, Value::as_str)
            .and_then(|name| {
                name.parse::<Sound>()
                    .map_err(|e| warn!("payload for alarm {alarm_id:?}: {e}, using default"))
                    .ok()
            })
            .unwrap_or_default();

        let slowly_increase_volume =
            field(table, SLOWLY_INCREASE_VOLUME, Value::as_bool).unwrap_or(false);

        let snooze_minutes = table
            .get(SNOOZE_MINUTES)
            .and_then(Value::as_integer)
            .and_then(|minutes| u32::try_from(minutes).ok())
            .filter(|minutes| SNOOZE_RANGE.contains(minutes));

        Self {
            alarm_id,
            label,
            sound,
            slowly_increase_volume,
            snooze_minutes,
        }
    }

    /// parses the text form of a payload, unreadable text decodes as empty
    #[must_use]
    pub fn decode_text(text: &str) -> Self {
        let raw = text.parse::<RawPayload>().unwrap_or_else(|e| {
            warn!("unreadable trigger payload, using defaults: {e}");
            RawPayload::default()
        });
        Self::decode(&raw)
    }

    /// the label, or the default one if it is empty
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            DEFAULT_LABEL
        } else {
            &self.label
        }
    }
}

/// reads one field, logging when it has to be defaulted
fn field<'a, T>(
    table: &'a Table,
    key: &str,
    read: impl FnOnce(&'a Value) -> Option<T>,
) -> Option<T> {
    let value = table.get(key).and_then(read);
    if value.is_none() {
        warn!("trigger payload field {key} is missing or malformed, using default");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn payload() -> Payload {
        Payload {
            alarm_id: AlarmId::new("X"),
            label: "Morning Alarm".to_string(),
            sound: Sound::Chimes,
            slowly_increase_volume: true,
            snooze_minutes: Some(5),
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let payload = payload();
        assert_eq!(Payload::decode(&payload.encode()), payload);

        let without_snooze = Payload {
            label: String::new(),
            snooze_minutes: None,
            ..payload
        };
        assert_eq!(Payload::decode(&without_snooze.encode()), without_snooze);
    }

    #[test_case("X", "", Sound::Piano, false, None; "empty label")]
    #[test_case("X", "Gym", Sound::Chimes, false, Some(1); "shortest snooze")]
    #[test_case("X", "Gym", Sound::Piano, true, Some(30); "longest snooze ramped")]
    #[test_case("réveil-日本-🔔", "Frühstück", Sound::Chimes, true, None; "non ascii id and label")]
    fn decode_inverts_encode_for(
        id: &str,
        label: &str,
        sound: Sound,
        slowly_increase_volume: bool,
        snooze_minutes: Option<u32>,
    ) {
        let payload = Payload {
            alarm_id: AlarmId::new(id),
            label: label.to_string(),
            sound,
            slowly_increase_volume,
            snooze_minutes,
        };
        assert_eq!(Payload::decode(&payload.encode()), payload);
        assert_eq!(Payload::decode_text(&payload.encode().to_string()), payload);
    }

    #[test]
    fn text_form_round_trips() {
        let payload = payload();
        let text = payload.encode().to_string();
        assert_eq!(Payload::decode_text(&text), payload);
    }

    #[test]
    fn missing_label_uses_default_phrase() {
        let mut raw = payload().encode();
        raw.table_mut().remove(LABEL);
        let decoded = Payload::decode(&raw);
        assert_eq!(decoded.label, DEFAULT_LABEL);
        assert_eq!(decoded.alarm_id, AlarmId::new("X"));
    }

    #[test]
    fn legacy_payload_without_sound_fields() {
        let mut table = Table::new();
        table.insert(ALARM_ID.into(), Value::String("X".into()));
        table.insert(LABEL.into(), Value::String("Gym".into()));
        let decoded = Payload::decode(&RawPayload::new(table));
        assert_eq!(decoded.sound, Sound::Piano);
        assert!(!decoded.slowly_increase_volume);
        assert_eq!(decoded.snooze_minutes, None);
        assert_eq!(decoded.label, "Gym");
    }

    #[test]
    fn mistyped_fields_degrade_one_by_one() {
        let mut table = Table::new();
        table.insert(ALARM_ID.into(), Value::String("X".into()));
        table.insert(LABEL.into(), Value::Integer(3));
        table.insert(SOUND.into(), Value::String("Foghorn".into()));
        table.insert(SLOWLY_INCREASE_VOLUME.into(), Value::String("yes".into()));
        table.insert(SNOOZE_MINUTES.into(), Value::Integer(90));
        let decoded = Payload::decode(&RawPayload::new(table));
        assert_eq!(
            decoded,
            Payload {
                alarm_id: AlarmId::new("X"),
                label: DEFAULT_LABEL.to_string(),
                sound: Sound::Piano,
                slowly_increase_volume: false,
                snooze_minutes: None,
            }
        );
    }

    #[test]
    fn garbage_text_decodes_to_defaults() {
        let decoded = Payload::decode_text("this is = = not toml");
        assert!(decoded.alarm_id.is_empty());
        assert_eq!(decoded.label, DEFAULT_LABEL);
    }

    #[test]
    fn legacy_lowercase_sound_name() {
        let mut raw = payload().encode();
        raw.table_mut()
            .insert(SOUND.into(), Value::String("piano".into()));
        assert_eq!(Payload::decode(&raw).sound, Sound::Piano);
    }
}
