use std::path::{Path, PathBuf};

use crate::{
    alarm::{AlarmId, Sound},
    payload::Payload,
    trigger::TriggerKind,
};

/// What the sound player and the notification need from a fired trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCue {
    pub alarm_id: AlarmId,
    pub sound: Sound,
    pub slowly_increase_volume: bool,
    pub title: String,
    pub body: String,
    /// whether the user may snooze it
    pub snoozable: bool,
}

impl SoundCue {
    #[must_use]
    pub fn new(alarm_id: AlarmId, payload: &Payload, kind: TriggerKind) -> Self {
        Self {
            alarm_id,
            sound: payload.sound,
            slowly_increase_volume: payload.slowly_increase_volume,
            title: match kind {
                TriggerKind::Primary => "Alarm",
                TriggerKind::Snooze => "Snoozed Alarm",
            }
            .to_string(),
            body: payload.display_label().to_string(),
            snoozable: kind == TriggerKind::Snooze || payload.snooze_minutes.is_some(),
        }
    }

    /// the asset to play, inside `sounds_dir`
    #[must_use]
    pub fn sound_path(&self, sounds_dir: &Path) -> PathBuf {
        sounds_dir.join(self.sound.file_name(self.slowly_increase_volume))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: AlarmId,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: AlarmId) -> Self {
        Self { kind, alarm_id }
    }

    #[must_use]
    pub fn triggered(cue: &SoundCue, sounds_dir: &Path) -> Self {
        Self::new(
            MessageType::AlarmTriggered {
                sound_path: cue.sound_path(sounds_dir),
            },
            cue.alarm_id.clone(),
        )
    }

    #[must_use]
    pub fn stopped(alarm_id: AlarmId) -> Self {
        Self::new(MessageType::AlarmStopped, alarm_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    AlarmTriggered { sound_path: PathBuf },
    // snoozed, stopped, or the alarm went away
    AlarmStopped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::Alarm;

    #[test]
    fn cue_resolves_ramped_asset() {
        let alarm = Alarm::at(7, 0)
            .unwrap()
            .with_id("X")
            .with_sound(Sound::Chimes, true)
            .with_snooze(None);
        let cue = SoundCue::new(alarm.id.clone(), &Payload::from(&alarm), TriggerKind::Primary);
        assert_eq!(cue.title, "Alarm");
        assert!(!cue.snoozable);
        assert_eq!(
            cue.sound_path(Path::new("/sounds")),
            PathBuf::from("/sounds/Chimes-increasing.wav")
        );
    }

    #[test]
    fn snooze_cue_is_always_snoozable() {
        let alarm = Alarm::at(7, 0).unwrap().with_snooze(None);
        let cue = SoundCue::new(alarm.id.clone(), &Payload::from(&alarm), TriggerKind::Snooze);
        assert_eq!(cue.title, "Snoozed Alarm");
        assert!(cue.snoozable);
        assert_eq!(cue.body, crate::alarm::DEFAULT_LABEL);
    }
}
