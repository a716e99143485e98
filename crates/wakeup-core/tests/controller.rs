//! Controller behaviour against an in-memory alarm server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use wakeup_core::alarm::{AlarmId, AlarmRecord, AlarmRegistry, ChallengeType, NewAlarm};
use wakeup_core::api::{AlarmApi, SoundEntry, Statistics};
use wakeup_core::challenge::{ChallengeMachine, ChallengeRecord, Phase, Timings};
use wakeup_core::clock::{Clock, Moment};
use wakeup_core::error::ApiError;
use wakeup_core::events::{EventKind, StatisticsEvent};
use wakeup_core::presentation::{Notice, NoticeLevel, Presenter, Screen};
use wakeup_core::sound::{AudioSink, PlaybackError, SoundLibrary, SoundSource};
use wakeup_core::{AlarmController, UserInput};

#[derive(Default)]
struct ServerState {
    alarms: Vec<AlarmRecord>,
    events: Vec<StatisticsEvent>,
    next_id: u64,
    fail_delete: bool,
    failing_challenges: usize,
    challenges_served: usize,
}

#[derive(Clone, Default)]
struct FakeApi {
    state: Arc<Mutex<ServerState>>,
}

impl FakeApi {
    fn with_alarms(alarms: Vec<AlarmRecord>) -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.next_id = 100;
            state.alarms = alarms;
        }
        api
    }

    fn events(&self) -> Vec<EventKind> {
        self.state.lock().unwrap().events.iter().map(|e| e.event).collect()
    }
}

impl AlarmApi for FakeApi {
    async fn list_alarms(&self) -> Result<Vec<AlarmRecord>, ApiError> {
        Ok(self.state.lock().unwrap().alarms.clone())
    }

    async fn create_alarm(&self, alarm: &NewAlarm) -> Result<AlarmRecord, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = AlarmRecord {
            id: AlarmId::new(state.next_id.to_string()),
            time: alarm.time,
            label: alarm.label.clone(),
            challenge_type: alarm.challenge_type,
            sound: alarm.sound.clone(),
            enabled: alarm.enabled,
            fired_this_minute: false,
        };
        state.alarms.push(record.clone());
        Ok(record)
    }

    async fn delete_alarm(&self, id: &AlarmId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(ApiError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        state.alarms.retain(|a| &a.id != id);
        Ok(())
    }

    async fn toggle_alarm(&self, id: &AlarmId) -> Result<bool, ApiError> {
        let mut state = self.state.lock().unwrap();
        let alarm = state
            .alarms
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| ApiError::Rejected("Alarm not found".into()))?;
        alarm.enabled = !alarm.enabled;
        Ok(alarm.enabled)
    }

    async fn fetch_challenge(&self, challenge_type: ChallengeType) -> Result<ChallengeRecord, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_challenges > 0 {
            state.failing_challenges -= 1;
            return Err(ApiError::Malformed("no challenge".into()));
        }
        state.challenges_served += 1;
        Ok(ChallengeRecord {
            challenge_type,
            prompt: "Solve: 6 * 7".into(),
            expected_answer: "42".into(),
        })
    }

    async fn record_event(&self, event: &StatisticsEvent) -> Result<(), ApiError> {
        self.state.lock().unwrap().events.push(event.clone());
        Ok(())
    }

    async fn statistics(&self) -> Result<Statistics, ApiError> {
        let state = self.state.lock().unwrap();
        let successes = state
            .events
            .iter()
            .filter(|e| e.event == EventKind::Success)
            .count() as u64;
        Ok(Statistics {
            total_alarms: state.alarms.len() as u64,
            successful_wakeups: successes,
            ..Statistics::default()
        })
    }

    async fn list_sounds(&self) -> Result<Vec<SoundEntry>, ApiError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeSink {
    blocked_attempts: usize,
    played: Vec<String>,
    stops: usize,
}

impl AudioSink for FakeSink {
    fn play_looped(&mut self, source: &SoundSource) -> Result<(), PlaybackError> {
        if self.blocked_attempts > 0 {
            self.blocked_attempts -= 1;
            return Err(PlaybackError::Blocked);
        }
        self.played.push(source.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

#[derive(Default)]
struct RecordingPresenter {
    screens: Vec<Screen>,
    notices: Vec<Notice>,
    alarm_counts: Vec<usize>,
    stats: Option<Statistics>,
}

impl RecordingPresenter {
    fn last_screen(&self) -> &Screen {
        self.screens.last().expect("nothing rendered")
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, screen: &Screen) {
        self.screens.push(screen.clone());
    }

    fn notice(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }

    fn show_alarms(&mut self, alarms: &AlarmRegistry) {
        self.alarm_counts.push(alarms.len());
    }

    fn show_statistics(&mut self, stats: &Statistics) {
        self.stats = Some(stats.clone());
    }
}

/// Clock that follows tokio's time, so paused tests drive it with `sleep`.
struct TokioClock {
    origin: Instant,
    start: NaiveDateTime,
}

impl TokioClock {
    fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            origin: Instant::now(),
            start,
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Moment {
        Moment::new(self.start, 0).plus_ms(self.origin.elapsed().as_millis() as u64)
    }
}

type Controller = AlarmController<FakeApi, FakeSink, RecordingPresenter>;

fn at(h: u32, m: u32, s: u32) -> Moment {
    let wall = NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap();
    Moment::new(wall, u64::from(wall.num_seconds_from_midnight()) * 1000)
}

fn seven_am() -> AlarmRecord {
    AlarmRecord {
        id: AlarmId::new("1"),
        time: "07:00".parse().unwrap(),
        label: "Gym".into(),
        challenge_type: ChallengeType::Math,
        sound: "intense".into(),
        enabled: true,
        fired_this_minute: false,
    }
}

fn controller(api: &FakeApi, sink: FakeSink) -> Controller {
    let machine = ChallengeMachine::new(Timings::default(), SoundLibrary::default());
    AlarmController::new(api.clone(), machine, sink, RecordingPresenter::default())
}

#[tokio::test]
async fn load_and_create_alarms() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();
    assert_eq!(ctl.registry().len(), 1);

    let form = NewAlarm::from_form("06:30", None, Some("sentence"), None).unwrap();
    let created = ctl.create_alarm(form).await.unwrap();
    assert_eq!(created.label, "Alarm");
    assert_eq!(ctl.registry().len(), 2);
    assert!(ctl.registry().get(&created.id).is_some());
    assert_eq!(ctl.presenter().alarm_counts, vec![1, 2]);
    assert_eq!(ctl.presenter().notices.last().unwrap().level, NoticeLevel::Success);
}

#[tokio::test]
async fn delete_removes_local_copy_even_when_server_fails() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    api.state.lock().unwrap().fail_delete = true;
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    assert!(ctl.delete_alarm(&AlarmId::new("1")).await.is_err());
    assert!(ctl.registry().is_empty());
    let notice = ctl.presenter().notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.starts_with("Failed to delete alarm"));
}

#[tokio::test]
async fn toggle_follows_server_flag() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    assert!(!ctl.toggle_alarm(&AlarmId::new("1")).await.unwrap());
    assert!(!ctl.registry().get(&AlarmId::new("1")).unwrap().enabled);

    // Disabled alarms stay silent at their minute.
    ctl.on_tick(at(7, 0, 0));
    assert!(!ctl.machine().is_active());
    assert!(ctl.player().sink().played.is_empty());
}

#[tokio::test]
async fn full_wake_up_flow() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(6, 59, 59));
    assert!(!ctl.machine().is_active());

    ctl.on_tick(at(7, 0, 0));
    assert_eq!(ctl.presenter().last_screen(), &Screen::Ringing { label: "Gym".into() });
    assert_eq!(ctl.player().sink().played, vec!["/static/sounds/intense.mp3".to_string()]);

    ctl.handle_input(UserInput::Stop, at(7, 0, 10));
    assert!(ctl.player().current().is_none());
    assert!(matches!(ctl.presenter().last_screen(), Screen::AwaitingChallenge { .. }));

    // Countdown re-rendered on ticks while waiting.
    ctl.on_tick(at(7, 1, 10));
    match ctl.presenter().last_screen() {
        Screen::AwaitingChallenge { countdown, .. } => assert_eq!(countdown.remaining_secs, 60),
        other => panic!("unexpected screen {other:?}"),
    }

    let open = at(7, 2, 10);
    ctl.on_deadline(open);
    assert_eq!(ctl.machine().phase(), Phase::Challenging);
    ctl.process_next_completion(open).await;
    match ctl.presenter().last_screen() {
        Screen::Challenge { prompt, countdown, .. } => {
            assert_eq!(prompt.as_deref(), Some("Solve: 6 * 7"));
            assert_eq!(countdown.as_ref().unwrap().remaining_secs, 120);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    let answered = open.plus_ms(30_000);
    ctl.handle_input(UserInput::Submit(" 42 ".into()), answered);
    assert_eq!(ctl.presenter().last_screen(), &Screen::Success);

    ctl.on_deadline(answered.plus_ms(1_500));
    assert_eq!(ctl.presenter().last_screen(), &Screen::Idle);
    assert!(!ctl.machine().is_active());

    // Dismissal refreshes statistics.
    ctl.process_next_completion(answered.plus_ms(1_500)).await;
    ctl.flush_reports().await;
    assert_eq!(
        api.events(),
        vec![EventKind::Triggered, EventKind::Stopped, EventKind::Success]
    );
    assert_eq!(ctl.statistics().unwrap().successful_wakeups, 1);
    assert!(ctl.presenter().stats.is_some());
}

#[tokio::test]
async fn failed_challenge_fetch_is_retried() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    api.state.lock().unwrap().failing_challenges = 1;
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(7, 0, 0));
    ctl.handle_input(UserInput::Stop, at(7, 0, 0));
    let open = at(7, 2, 0);
    ctl.on_deadline(open);
    ctl.process_next_completion(open).await;
    assert!(matches!(
        ctl.presenter().last_screen(),
        Screen::Challenge { loading_failed: true, prompt: None, countdown: None, .. }
    ));

    // Answers are ignored while no prompt is shown.
    ctl.handle_input(UserInput::Submit("42".into()), open.plus_ms(1_000));
    assert_eq!(ctl.machine().phase(), Phase::Challenging);

    let retry = open.plus_ms(5_000);
    ctl.on_deadline(retry);
    ctl.process_next_completion(retry).await;
    assert!(matches!(
        ctl.presenter().last_screen(),
        Screen::Challenge { loading_failed: false, prompt: Some(_), .. }
    ));
    assert_eq!(api.state.lock().unwrap().challenges_served, 1);
}

#[tokio::test]
async fn blocked_audio_starts_on_first_interaction() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let sink = FakeSink {
        blocked_attempts: 1,
        ..FakeSink::default()
    };
    let mut ctl = controller(&api, sink);
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(7, 0, 0));
    assert_eq!(ctl.machine().phase(), Phase::Ringing);
    assert!(ctl.player().sink().played.is_empty());
    assert!(ctl.player().is_deferred());

    ctl.handle_input(UserInput::Interaction, at(7, 0, 3));
    assert_eq!(ctl.player().sink().played.len(), 1);
    assert_eq!(ctl.machine().phase(), Phase::Ringing);
}

#[tokio::test]
async fn snooze_updates_registry_and_notifies() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(7, 0, 0));
    ctl.handle_input(UserInput::Snooze, at(7, 0, 30));
    assert_eq!(
        ctl.registry().get(&AlarmId::new("1")).unwrap().time.to_string(),
        "07:05"
    );
    let notice = ctl.presenter().notices.last().unwrap();
    assert_eq!(notice.message, "Alarm snoozed for 5 minutes");
    assert_eq!(ctl.presenter().last_screen(), &Screen::Idle);

    ctl.flush_reports().await;
    assert_eq!(api.events(), vec![EventKind::Triggered, EventKind::Snoozed]);
}

#[tokio::test]
async fn server_side_changes_reach_the_trigger_after_reload() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    // Another client disables 07:00 and adds 07:30.
    api.toggle_alarm(&AlarmId::new("1")).await.unwrap();
    let half_past = NewAlarm::from_form("07:30", Some("Run"), None, None).unwrap();
    let added = api.create_alarm(&half_past).await.unwrap();

    ctl.reload_alarms();
    ctl.process_next_completion(at(6, 59, 0)).await;
    assert_eq!(ctl.registry().len(), 2);
    assert_eq!(ctl.presenter().alarm_counts, vec![1, 2]);

    ctl.on_tick(at(7, 0, 0));
    assert!(!ctl.machine().is_active());
    assert!(ctl.player().sink().played.is_empty());

    ctl.on_tick(at(7, 30, 0));
    assert_eq!(ctl.machine().phase(), Phase::Ringing);
    assert_eq!(ctl.presenter().last_screen(), &Screen::Ringing { label: "Run".into() });
    assert!(ctl.registry().get(&added.id).unwrap().fired_this_minute);
}

#[tokio::test]
async fn reload_keeps_ringing_alarm_and_snoozed_time() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(7, 0, 0));
    ctl.reload_alarms();
    ctl.process_next_completion(at(7, 0, 1)).await;
    assert!(ctl.registry().get(&AlarmId::new("1")).unwrap().fired_this_minute);

    ctl.handle_input(UserInput::Snooze, at(7, 0, 30));
    ctl.reload_alarms();
    ctl.process_next_completion(at(7, 1, 0)).await;
    assert_eq!(
        ctl.registry().get(&AlarmId::new("1")).unwrap().time.to_string(),
        "07:05"
    );

    ctl.on_tick(at(7, 5, 0));
    assert_eq!(ctl.machine().phase(), Phase::Ringing);
}

#[tokio::test]
async fn stop_while_audio_blocked_never_starts_the_sound() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let sink = FakeSink {
        blocked_attempts: 1,
        ..FakeSink::default()
    };
    let mut ctl = controller(&api, sink);
    ctl.load_alarms().await.unwrap();

    ctl.on_tick(at(7, 0, 0));
    assert!(ctl.player().is_deferred());

    ctl.handle_input(UserInput::Stop, at(7, 0, 2));
    assert!(ctl.player().sink().played.is_empty());
    assert!(!ctl.player().is_deferred());
    assert_eq!(ctl.machine().phase(), Phase::AwaitingChallengeStart);
}

#[tokio::test(start_paused = true)]
async fn run_loop_opens_challenge_on_deadline_and_flushes_on_shutdown() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    let clock = TokioClock::starting_at(at(7, 0, 0).wall);
    let (tx, rx) = mpsc::channel(4);

    let user = async move {
        sleep(Duration::from_millis(1_500)).await;
        tx.send(UserInput::Stop).await.unwrap();
        // The challenge opens at 121.5 s, between two clock ticks.
        sleep(Duration::from_millis(120_100)).await;
        tx.send(UserInput::Submit("42".into())).await.unwrap();
        sleep(Duration::from_secs(2)).await;
        drop(tx);
    };

    let (result, ()) = tokio::join!(ctl.run(&clock, rx), user);
    result.unwrap();

    assert!(ctl
        .presenter()
        .screens
        .iter()
        .any(|s| matches!(s, Screen::Challenge { prompt: Some(_), .. })));
    assert!(ctl.presenter().screens.contains(&Screen::Success));
    assert_eq!(ctl.presenter().last_screen(), &Screen::Idle);
    assert!(!ctl.machine().is_active());
    assert_eq!(api.state.lock().unwrap().challenges_served, 1);
    assert_eq!(
        api.events(),
        vec![EventKind::Triggered, EventKind::Stopped, EventKind::Success]
    );
}

#[tokio::test(start_paused = true)]
async fn closing_input_dismisses_active_alarm() {
    let api = FakeApi::with_alarms(vec![seven_am()]);
    let mut ctl = controller(&api, FakeSink::default());
    let clock = TokioClock::starting_at(at(7, 0, 0).wall);
    let (tx, rx) = mpsc::channel(4);

    let user = async move {
        sleep(Duration::from_millis(500)).await;
        tx.send(UserInput::Stop).await.unwrap();
        sleep(Duration::from_secs(10)).await;
        drop(tx);
    };

    let (result, ()) = tokio::join!(ctl.run(&clock, rx), user);
    result.unwrap();

    assert!(!ctl.machine().is_active());
    assert_eq!(ctl.presenter().last_screen(), &Screen::Idle);
    assert_eq!(ctl.player().sink().played.len(), 1);
    assert_eq!(api.events(), vec![EventKind::Triggered, EventKind::Stopped]);
    assert_eq!(api.state.lock().unwrap().challenges_served, 0);
}
