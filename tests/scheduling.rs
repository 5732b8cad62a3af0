use reveille::{
    backend::{memory::BackendCall, MemoryBackend},
    clock::IgnoreReason,
    Alarm, AlarmClock, AlarmId, AlarmStore, FireOutcome, FiredTrigger, Recurrence, SnoozeSettings,
    SnoozeState, SnoozeTransition, TriggerId, UserAction,
};

fn clock() -> AlarmClock<MemoryBackend> {
    AlarmClock::new(
        AlarmStore::new(),
        MemoryBackend::new(),
        SnoozeSettings::default(),
    )
}

fn x() -> AlarmId {
    AlarmId::new("X")
}

fn wake_up() -> Alarm {
    Alarm::at(7, 0)
        .unwrap()
        .with_id("X")
        .with_label("Wake up")
        .with_snooze(Some(5))
}

/// creates X and lets its daily trigger fire
fn ringing_clock() -> (AlarmClock<MemoryBackend>, FiredTrigger) {
    let mut clock = clock();
    clock.create_alarm(wake_up()).unwrap();
    let fired = clock.backend_mut().fire(&TriggerId::primary(&x())).unwrap();
    clock.backend_mut().take_calls();
    (clock, fired)
}

fn scheduled(call: &BackendCall) -> (&str, &Recurrence) {
    match call {
        BackendCall::Schedule(trigger) => (trigger.id.as_str(), &trigger.recurrence),
        other => panic!("expected a schedule call, got {other:?}"),
    }
}

#[test]
fn create_schedules_the_daily_trigger() {
    let mut clock = clock();
    clock.create_alarm(wake_up()).unwrap();
    let calls = clock.backend().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        scheduled(&calls[0]),
        ("alarm-X", &Recurrence::Daily { hour: 7, minute: 0 })
    );
}

#[test]
fn update_replaces_the_daily_trigger() {
    let mut clock = clock();
    clock.create_alarm(wake_up()).unwrap();
    clock.backend_mut().take_calls();

    let later = Alarm::at(7, 30)
        .unwrap()
        .with_id("X")
        .with_label("Wake up");
    clock.update_alarm(later).unwrap();
    let calls = clock.backend().calls();
    assert_eq!(calls[0], BackendCall::Cancel(TriggerId::primary(&x())));
    assert_eq!(
        scheduled(&calls[1]),
        ("alarm-X", &Recurrence::Daily { hour: 7, minute: 30 })
    );
    assert_eq!(clock.backend().pending().len(), 1);
}

#[test]
fn postpone_schedules_a_snooze_trigger() {
    let (mut clock, fired) = ringing_clock();
    let outcome = clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    assert_eq!(
        outcome,
        FireOutcome::Snoozed {
            alarm_id: x(),
            transition: SnoozeTransition::Snoozed { minutes: 5 },
        }
    );
    let calls = clock.backend().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        scheduled(&calls[0]),
        (
            "snoozedAlarm-X",
            &Recurrence::Interval {
                minutes: 5,
                repeats: false
            }
        )
    );
}

#[test]
fn stop_cancels_the_snooze_trigger() {
    let (mut clock, fired) = ringing_clock();
    clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    clock.backend_mut().take_calls();

    let outcome = clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Stop)
        .unwrap();
    assert!(matches!(
        outcome,
        FireOutcome::Stopped {
            transition: SnoozeTransition::Stopped,
            ..
        }
    ));
    assert_eq!(
        clock.backend().calls(),
        [BackendCall::Cancel(TriggerId::snooze(&x()))]
    );
    assert_eq!(clock.snooze_state(&x()), SnoozeState::Idle);
    // the daily trigger is untouched
    assert!(clock.backend().is_pending(&TriggerId::primary(&x())));
}

#[test]
fn stop_with_nothing_pending_is_idempotent() {
    let (mut clock, fired) = ringing_clock();
    for _ in 0..2 {
        let outcome = clock
            .on_trigger_fired(&fired.id, &fired.payload, UserAction::Stop)
            .unwrap();
        assert!(matches!(
            outcome,
            FireOutcome::Stopped {
                transition: SnoozeTransition::AlreadyIdle,
                ..
            }
        ));
    }
    assert_eq!(clock.backend().pending().len(), 1);
}

#[test]
fn postponing_twice_leaves_one_snooze() {
    let (mut clock, fired) = ringing_clock();
    clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    let again = clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    assert!(matches!(
        again,
        FireOutcome::Snoozed {
            transition: SnoozeTransition::Resnoozed { minutes: 5 },
            ..
        }
    ));
    let snoozes = clock
        .backend()
        .pending()
        .into_iter()
        .filter(|trigger| trigger.id == TriggerId::snooze(&x()))
        .count();
    assert_eq!(snoozes, 1);
}

#[test]
fn delete_while_snoozed_cancels_both() {
    let (mut clock, fired) = ringing_clock();
    clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    clock.backend_mut().take_calls();

    clock.delete_alarm(&x()).unwrap();
    assert_eq!(
        clock.backend().calls(),
        [
            BackendCall::Cancel(TriggerId::primary(&x())),
            BackendCall::Cancel(TriggerId::snooze(&x())),
        ]
    );
    assert!(clock.backend().pending().is_empty());
    assert_eq!(clock.snooze_state(&x()), SnoozeState::Idle);
}

#[test]
fn postpone_after_delete_is_a_no_op() {
    let (mut clock, fired) = ringing_clock();
    clock.delete_alarm(&x()).unwrap();
    clock.backend_mut().take_calls();

    let outcome = clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    assert_eq!(outcome, FireOutcome::Ignored(IgnoreReason::UnknownAlarm(x())));
    assert!(clock.backend().calls().is_empty());
    assert!(clock.backend().pending().is_empty());
}

#[test]
fn snooze_trigger_rings_as_snoozed_alarm() {
    let (mut clock, fired) = ringing_clock();
    clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();
    let snooze = clock.backend_mut().fire(&TriggerId::snooze(&x())).unwrap();
    // one shot, the backend dropped it
    assert!(!clock.backend().is_pending(&snooze.id));

    let outcome = clock
        .on_trigger_fired(&snooze.id, &snooze.payload, UserAction::None)
        .unwrap();
    let FireOutcome::Ringing(cue) = outcome else {
        panic!("snooze trigger should ring");
    };
    assert_eq!(cue.title, "Snoozed Alarm");
    assert_eq!(cue.body, "Wake up");
    assert!(cue.snoozable);
    assert_eq!(clock.snooze_state(&x()), SnoozeState::Idle);
}

#[test]
fn repeating_snooze_keeps_ringing_until_stopped() {
    let mut clock = AlarmClock::new(
        AlarmStore::new(),
        MemoryBackend::new(),
        SnoozeSettings {
            repeat: true,
            ..SnoozeSettings::default()
        },
    );
    clock.create_alarm(wake_up()).unwrap();
    let fired = clock.backend_mut().fire(&TriggerId::primary(&x())).unwrap();
    clock
        .on_trigger_fired(&fired.id, &fired.payload, UserAction::Postpone)
        .unwrap();

    let snooze = clock.backend_mut().fire(&TriggerId::snooze(&x())).unwrap();
    clock
        .on_trigger_fired(&snooze.id, &snooze.payload, UserAction::None)
        .unwrap();
    assert!(clock.backend().is_pending(&snooze.id));
    assert_eq!(clock.snooze_state(&x()), SnoozeState::Snoozed { minutes: 5 });

    clock
        .on_trigger_fired(&snooze.id, &snooze.payload, UserAction::Stop)
        .unwrap();
    assert!(!clock.backend().is_pending(&snooze.id));
}
