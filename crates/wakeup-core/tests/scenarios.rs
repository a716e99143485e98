//! End-to-end alarm flows over the pure engine: trigger, machine and registry
//! driven by explicit moments, no runtime or network involved.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use proptest::prelude::*;

use wakeup_core::alarm::{AlarmId, AlarmRecord, AlarmRegistry, ChallengeType, ClockTime};
use wakeup_core::challenge::{ChallengeMachine, ChallengeRecord, Effect, FetchToken, Phase, Timings};
use wakeup_core::clock::Moment;
use wakeup_core::events::EventKind;
use wakeup_core::sound::{SoundLibrary, SoundSource};
use wakeup_core::trigger::TriggerEngine;
use wakeup_core::Screen;

fn wall(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn at(h: u32, m: u32, s: u32) -> Moment {
    let w = wall(h, m, s);
    Moment::new(w, u64::from(w.num_seconds_from_midnight()) * 1000)
}

fn alarm(id: &str, time: &str, challenge_type: ChallengeType) -> AlarmRecord {
    AlarmRecord {
        id: AlarmId::new(id),
        time: time.parse().unwrap(),
        label: "Wake up".into(),
        challenge_type,
        sound: "birds".into(),
        enabled: true,
        fired_this_minute: false,
    }
}

fn math() -> ChallengeRecord {
    ChallengeRecord {
        challenge_type: ChallengeType::Math,
        prompt: "Solve: 17 + 25".into(),
        expected_answer: "42".into(),
    }
}

fn reported(effects: &[Effect]) -> Vec<EventKind> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Report(ev) => Some(ev.event),
            _ => None,
        })
        .collect()
}

fn fetch(effects: &[Effect]) -> Option<(FetchToken, ChallengeType)> {
    effects.iter().find_map(|e| match e {
        Effect::FetchChallenge {
            token,
            challenge_type,
        } => Some((*token, *challenge_type)),
        _ => None,
    })
}

struct Rig {
    registry: AlarmRegistry,
    trigger: TriggerEngine,
    machine: ChallengeMachine,
}

impl Rig {
    fn new(alarms: Vec<AlarmRecord>) -> Self {
        let mut registry = AlarmRegistry::new();
        registry.load(alarms);
        Self {
            registry,
            trigger: TriggerEngine::new(),
            machine: ChallengeMachine::new(Timings::default(), SoundLibrary::default()),
        }
    }

    fn tick(&mut self, now: Moment) -> Vec<Effect> {
        let mut effects = Vec::new();
        let busy = self.machine.is_active();
        if let Some(alarm) = self.trigger.check(&mut self.registry, now.clock_time(), busy) {
            effects.extend(self.machine.start_ringing(alarm, now));
        }
        effects.extend(self.machine.poll(now));
        effects
    }

    /// Ring at 07:00, stop at 07:00:05 and open the challenge two minutes later.
    fn ring_stop_and_open(&mut self) -> (FetchToken, Moment) {
        let effects = self.tick(at(7, 0, 0));
        assert_eq!(reported(&effects), vec![EventKind::Triggered]);
        assert_eq!(self.machine.phase(), Phase::Ringing);

        let effects = self.machine.stop(at(7, 0, 5));
        assert_eq!(reported(&effects), vec![EventKind::Stopped]);
        assert!(effects.contains(&Effect::StopSound));
        assert_eq!(self.machine.phase(), Phase::AwaitingChallengeStart);

        let open = at(7, 2, 5);
        let effects = self.tick(open);
        assert_eq!(self.machine.phase(), Phase::Challenging);
        let (token, ty) = fetch(&effects).expect("challenge requested");
        assert_eq!(ty, ChallengeType::Math);
        (token, open)
    }
}

#[test]
fn correct_answer_returns_to_idle_and_refreshes_statistics() {
    let mut rig = Rig::new(vec![alarm("1", "07:00", ChallengeType::Math)]);
    let (token, open) = rig.ring_stop_and_open();

    rig.machine.challenge_loaded(token, Ok(math()), open);
    match rig.machine.screen(open) {
        Screen::Challenge {
            prompt: Some(prompt),
            countdown: Some(countdown),
            ..
        } => {
            assert_eq!(prompt, "Solve: 17 + 25");
            assert_eq!(countdown.remaining_secs, 120);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    // 10 seconds left on the clock.
    let answer_at = open.plus_ms(110_000);
    match rig.machine.screen(answer_at) {
        Screen::Challenge {
            countdown: Some(c), ..
        } => assert_eq!(c.remaining_secs, 10),
        other => panic!("unexpected screen {other:?}"),
    }
    let effects = rig.machine.submit("42", answer_at);
    assert_eq!(reported(&effects), vec![EventKind::Success]);
    assert_eq!(rig.machine.phase(), Phase::Succeeded);

    assert!(rig.machine.poll(answer_at.plus_ms(1_499)).is_empty());
    let effects = rig.machine.poll(answer_at.plus_ms(1_500));
    assert!(effects.contains(&Effect::RefreshStatistics));
    assert_eq!(rig.machine.phase(), Phase::Idle);
    assert!(!rig.machine.is_active());
}

#[test]
fn wrong_answer_rings_again_and_needs_a_new_challenge() {
    let mut rig = Rig::new(vec![alarm("1", "07:00", ChallengeType::Math)]);
    let (token, open) = rig.ring_stop_and_open();
    rig.machine.challenge_loaded(token, Ok(math()), open);

    let wrong_at = open.plus_ms(20_000);
    let effects = rig.machine.submit("41", wrong_at);
    assert_eq!(reported(&effects), vec![EventKind::Failed]);
    assert_eq!(rig.machine.phase(), Phase::Failed);

    let effects = rig.machine.poll(wrong_at.plus_ms(1_500));
    assert_eq!(rig.machine.phase(), Phase::Ringing);
    assert!(effects.contains(&Effect::PlaySound(SoundSource::new("/static/sounds/birds.mp3"))));
    assert!(fetch(&effects).is_none());

    // Nothing is fetched until Stop is pressed and the delay runs out again.
    let ringing_at = wrong_at.plus_ms(1_500);
    assert!(rig.machine.poll(ringing_at.plus_ms(600_000)).is_empty());
    rig.machine.stop(ringing_at);
    let effects = rig.machine.poll(ringing_at.plus_ms(120_000));
    let (second, _) = fetch(&effects).expect("fresh challenge requested");
    assert_ne!(second, token);
}

#[test]
fn snooze_moves_alarm_five_minutes_past_now() {
    let mut rig = Rig::new(vec![alarm("1", "07:00", ChallengeType::Math)]);
    rig.tick(at(7, 0, 0));

    let effects = rig.machine.snooze(&mut rig.registry, at(7, 0, 30));
    assert_eq!(reported(&effects), vec![EventKind::Snoozed]);
    assert!(effects.contains(&Effect::StopSound));
    assert_eq!(rig.machine.phase(), Phase::Idle);

    let stored = rig.registry.get(&AlarmId::new("1")).unwrap();
    assert_eq!(stored.time.to_string(), "07:05");
    assert!(!stored.fired_this_minute);

    // Rest of the original minute and the wait until 07:05: silence.
    for secs in (31..300).step_by(7) {
        let effects = rig.tick(at(7, 0, 0).plus_ms(secs * 1000));
        assert!(fetch(&effects).is_none());
        assert!(reported(&effects).is_empty());
    }
    let effects = rig.tick(at(7, 5, 0));
    assert_eq!(reported(&effects), vec![EventKind::Triggered]);
}

#[test]
fn answer_timeout_reports_once_and_rings_again() {
    let mut rig = Rig::new(vec![alarm("1", "07:00", ChallengeType::Math)]);
    let (token, open) = rig.ring_stop_and_open();
    let loaded = open.plus_ms(800);
    rig.machine.challenge_loaded(token, Ok(math()), loaded);

    let mut all = Vec::new();
    for step in 1..=130 {
        all.extend(rig.tick(loaded.plus_ms(step * 1_000)));
    }
    let timeouts = reported(&all)
        .into_iter()
        .filter(|k| *k == EventKind::Timeout)
        .count();
    assert_eq!(timeouts, 1);
    assert_eq!(rig.machine.phase(), Phase::Ringing);
}

#[test]
fn simultaneous_matches_ring_only_one_alarm() {
    let mut rig = Rig::new(vec![
        alarm("1", "07:00", ChallengeType::Math),
        alarm("2", "07:00", ChallengeType::Sentence),
    ]);
    let effects = rig.tick(at(7, 0, 0));
    assert_eq!(reported(&effects), vec![EventKind::Triggered]);
    assert_eq!(rig.machine.active_alarm_id(), Some(&AlarmId::new("1")));

    let second = rig.registry.get(&AlarmId::new("2")).unwrap();
    assert!(!second.fired_this_minute);

    // Still busy on later ticks of the same minute: dropped, not queued.
    let effects = rig.tick(at(7, 0, 30));
    assert!(reported(&effects).is_empty());
    assert_eq!(rig.machine.active_alarm_id(), Some(&AlarmId::new("1")));
}

#[test]
fn sentence_answers_are_trimmed_but_case_sensitive() {
    let record = ChallengeRecord {
        challenge_type: ChallengeType::Sentence,
        prompt: "Type exactly: Rise and shine".into(),
        expected_answer: "Rise and shine".into(),
    };
    assert!(record.accepts("  Rise and shine \n"));
    assert!(!record.accepts("rise and shine"));
}

proptest! {
    #[test]
    fn disabled_alarms_never_ring(
        hour in 0u8..24,
        minute in 0u8..60,
        busy in any::<bool>(),
    ) {
        let mut registry = AlarmRegistry::new();
        let mut record = alarm("9", "00:00", ChallengeType::Math);
        record.time = ClockTime::new(hour, minute).unwrap();
        record.enabled = false;
        registry.load(vec![record]);

        let fired = TriggerEngine::new().check(&mut registry, ClockTime::new(hour, minute).unwrap(), busy);
        prop_assert!(fired.is_none());
    }

    #[test]
    fn snooze_is_now_plus_five_minutes(
        alarm_hour in 0u8..24,
        alarm_minute in 0u8..60,
        secs_of_day in 0u32..86_400,
    ) {
        let now_wall = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(secs_of_day / 3600, (secs_of_day / 60) % 60, secs_of_day % 60)
            .unwrap();
        let now = Moment::new(now_wall, 5_000);

        let mut record = alarm("3", "00:00", ChallengeType::Sentence);
        record.time = ClockTime::new(alarm_hour, alarm_minute).unwrap();
        let mut registry = AlarmRegistry::new();
        registry.load(vec![record.clone()]);

        let mut machine = ChallengeMachine::new(Timings::default(), SoundLibrary::default());
        machine.start_ringing(record, now);
        machine.snooze(&mut registry, now);

        let minutes = (secs_of_day / 60 + 5) % (24 * 60);
        let expected = ClockTime::new((minutes / 60) as u8, (minutes % 60) as u8).unwrap();
        let stored = registry.get(&AlarmId::new("3")).unwrap();
        prop_assert_eq!(stored.time, expected);
        prop_assert!(!stored.fired_this_minute);
        prop_assert!(!machine.is_active());
    }
}
