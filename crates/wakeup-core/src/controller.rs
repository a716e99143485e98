//! Async driver tying the engine to the server, audio and screen.
//!
//! One task owns the controller and runs [`AlarmController::run`]: each
//! iteration waits for the next of (a) the one-second clock tick, (b) the
//! nearest armed timer, (c) user input, (d) a finished background request,
//! and handles it to completion before waiting again. Network calls for the
//! alarm flow are spawned and report back through a channel, so a slow
//! server never stalls the clock.
//!
//! The alarm list is re-read from the server at every minute boundary, so
//! alarms created, deleted or toggled by another client take effect here.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::alarm::{AlarmId, AlarmRecord, AlarmRegistry, NewAlarm};
use crate::api::{AlarmApi, Statistics};
use crate::challenge::{ChallengeMachine, ChallengeRecord, Effect, FetchToken, Phase};
use crate::clock::{Clock, ClockPoller, Moment};
use crate::error::{ApiError, Result};
use crate::presentation::{Notice, Presenter};
use crate::reporter::EventReporter;
use crate::sound::{AudioSink, Player};
use crate::trigger::TriggerEngine;

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Snooze,
    Stop,
    Submit(String),
    /// Any other interaction (key press, click). Unblocks deferred audio.
    Interaction,
}

/// Result of a background request, delivered back to the controller task.
#[derive(Debug)]
pub enum Completion {
    Challenge {
        token: FetchToken,
        result: std::result::Result<ChallengeRecord, ApiError>,
    },
    Statistics(std::result::Result<Statistics, ApiError>),
    Alarms(std::result::Result<Vec<AlarmRecord>, ApiError>),
}

pub struct AlarmController<A, S, P> {
    api: A,
    registry: AlarmRegistry,
    trigger: TriggerEngine,
    machine: ChallengeMachine,
    player: Player<S>,
    presenter: P,
    reporter: EventReporter<A>,
    statistics: Option<Statistics>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<A, S, P> AlarmController<A, S, P>
where
    A: AlarmApi,
    S: AudioSink,
    P: Presenter,
{
    pub fn new(api: A, machine: ChallengeMachine, sink: S, presenter: P) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            reporter: EventReporter::new(api.clone()),
            api,
            registry: AlarmRegistry::new(),
            trigger: TriggerEngine::new(),
            machine,
            player: Player::new(sink),
            presenter,
            statistics: None,
            completions_tx,
            completions_rx,
        }
    }

    pub fn registry(&self) -> &AlarmRegistry {
        &self.registry
    }

    pub fn machine(&self) -> &ChallengeMachine {
        &self.machine
    }

    pub fn player(&self) -> &Player<S> {
        &self.player
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Last statistics received from the server.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    // ── Alarm management ─────────────────────────────────────────────

    /// Replace the registry with the server's alarm list.
    pub async fn load_alarms(&mut self) -> Result<()> {
        match self.api.list_alarms().await {
            Ok(alarms) => {
                tracing::info!(count = alarms.len(), "alarms loaded");
                self.registry.load(alarms);
                self.presenter.show_alarms(&self.registry);
                Ok(())
            }
            Err(e) => {
                self.presenter
                    .notice(&Notice::error(format!("Failed to load alarms: {e}")));
                Err(e.into())
            }
        }
    }

    /// Store `alarm` on the server and add the created record locally.
    pub async fn create_alarm(&mut self, alarm: NewAlarm) -> Result<AlarmRecord> {
        match self.api.create_alarm(&alarm).await {
            Ok(created) => {
                tracing::info!(alarm_id = %created.id, time = %created.time, "alarm created");
                self.registry.add(created.clone());
                self.presenter.show_alarms(&self.registry);
                self.presenter
                    .notice(&Notice::success("Alarm created successfully"));
                Ok(created)
            }
            Err(e) => {
                self.presenter
                    .notice(&Notice::error(format!("Failed to create alarm: {e}")));
                Err(e.into())
            }
        }
    }

    /// Delete on the server. The local copy goes away even if that fails.
    pub async fn delete_alarm(&mut self, id: &AlarmId) -> Result<()> {
        let outcome = self.api.delete_alarm(id).await;
        self.registry.remove(id);
        self.presenter.show_alarms(&self.registry);
        match outcome {
            Ok(()) => {
                tracing::info!(alarm_id = %id, "alarm deleted");
                self.presenter.notice(&Notice::success("Alarm deleted"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(alarm_id = %id, "server delete failed: {e}");
                self.presenter
                    .notice(&Notice::error(format!("Failed to delete alarm: {e}")));
                Err(e.into())
            }
        }
    }

    /// Flip an alarm's enabled flag. Returns the new value.
    pub async fn toggle_alarm(&mut self, id: &AlarmId) -> Result<bool> {
        match self.api.toggle_alarm(id).await {
            Ok(enabled) => {
                self.registry.set_enabled(id, enabled);
                self.presenter.show_alarms(&self.registry);
                Ok(enabled)
            }
            Err(e) => {
                self.presenter
                    .notice(&Notice::error(format!("Failed to toggle alarm: {e}")));
                Err(e.into())
            }
        }
    }

    pub async fn refresh_statistics(&mut self) -> Result<Statistics> {
        let stats = self.api.statistics().await?;
        self.show_statistics(stats.clone());
        Ok(stats)
    }

    // ── Event handling ───────────────────────────────────────────────

    /// Once-per-second work: clock display, trigger check, due timers,
    /// countdown refresh.
    pub fn on_tick(&mut self, now: Moment) {
        self.presenter.show_time(now.wall);

        let busy = self.machine.is_active();
        if let Some(alarm) = self.trigger.check(&mut self.registry, now.clock_time(), busy) {
            let effects = self.machine.start_ringing(alarm, now);
            self.apply(effects);
        }

        let effects = self.machine.poll(now);
        let rendered = effects.iter().any(|e| matches!(e, Effect::Present(_)));
        self.apply(effects);

        let counting_down = matches!(
            self.machine.phase(),
            Phase::AwaitingChallengeStart | Phase::Challenging
        );
        if !rendered && counting_down {
            self.presenter.render(&self.machine.screen(now));
        }
    }

    /// A timer deadline passed between ticks.
    pub fn on_deadline(&mut self, now: Moment) {
        let effects = self.machine.poll(now);
        self.apply(effects);
    }

    pub fn handle_input(&mut self, input: UserInput, now: Moment) {
        // Blocked audio is not retried for inputs that silence it.
        if !matches!(input, UserInput::Snooze | UserInput::Stop) {
            self.player.on_user_interaction();
        }
        let effects = match input {
            UserInput::Snooze => {
                let effects = self.machine.snooze(&mut self.registry, now);
                if !effects.is_empty() {
                    self.presenter.show_alarms(&self.registry);
                }
                effects
            }
            UserInput::Stop => self.machine.stop(now),
            UserInput::Submit(answer) => self.machine.submit(&answer, now),
            UserInput::Interaction => Vec::new(),
        };
        self.apply(effects);
    }

    pub fn handle_completion(&mut self, completion: Completion, now: Moment) {
        match completion {
            Completion::Challenge { token, result } => {
                let effects = self.machine.challenge_loaded(token, result, now);
                self.apply(effects);
            }
            Completion::Statistics(Ok(stats)) => self.show_statistics(stats),
            Completion::Statistics(Err(e)) => {
                tracing::warn!("statistics refresh failed: {e}");
            }
            Completion::Alarms(Ok(alarms)) => {
                if self.registry.sync(alarms) {
                    tracing::info!(count = self.registry.len(), "alarm list changed on server");
                    self.presenter.show_alarms(&self.registry);
                }
            }
            Completion::Alarms(Err(e)) => {
                tracing::warn!("alarm reload failed; keeping local list: {e}");
            }
        }
    }

    /// Wait for the next background request to finish and handle it.
    ///
    /// Only returns once something has been requested; callers must know a
    /// request is outstanding.
    pub async fn process_next_completion(&mut self, now: Moment) {
        if let Some(completion) = self.completions_rx.recv().await {
            self.handle_completion(completion, now);
        }
    }

    /// Re-read the alarm list in the background; the result is merged into
    /// the registry when it arrives as a [`Completion::Alarms`].
    pub fn reload_alarms(&self) {
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.list_alarms().await;
            let _ = tx.send(Completion::Alarms(result));
        });
    }

    /// Wait for in-flight statistics reports.
    pub async fn flush_reports(&mut self) {
        self.reporter.flush().await;
    }

    /// Drive the alarm clock until the input channel closes.
    pub async fn run(&mut self, clock: &dyn Clock, mut inputs: mpsc::Receiver<UserInput>) -> Result<()> {
        if let Err(e) = self.load_alarms().await {
            tracing::warn!("starting without alarms: {e}");
        }
        self.request_statistics();

        let mut poller = ClockPoller::new();
        poller.sample(clock);
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let wait = self
                .machine
                .next_deadline()
                .map(|due| Duration::from_millis(due.saturating_sub(clock.now().mono_ms)));

            tokio::select! {
                _ = interval.tick() => {
                    let tick = poller.sample(clock);
                    if tick.minute_changed {
                        tracing::debug!(minute = %tick.now.clock_time(), "minute boundary");
                        self.reload_alarms();
                    }
                    self.on_tick(tick.now);
                }
                _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {
                    self.on_deadline(clock.now());
                }
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input, clock.now()),
                    None => break,
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.handle_completion(completion, clock.now());
                }
            }
        }

        tracing::info!("input closed; shutting down");
        let effects = self.machine.dismiss(clock.now());
        self.apply(effects);
        self.reporter.flush().await;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PlaySound(source) => self.player.play(source),
                Effect::StopSound => self.player.stop(),
                Effect::Report(event) => self.reporter.report(event),
                Effect::FetchChallenge {
                    token,
                    challenge_type,
                } => {
                    let api = self.api.clone();
                    let tx = self.completions_tx.clone();
                    tokio::spawn(async move {
                        let result = api.fetch_challenge(challenge_type).await;
                        // Receiver lives as long as the controller.
                        let _ = tx.send(Completion::Challenge { token, result });
                    });
                }
                Effect::Present(screen) => self.presenter.render(&screen),
                Effect::Notice(notice) => self.presenter.notice(&notice),
                Effect::RefreshStatistics => self.request_statistics(),
            }
        }
    }

    fn request_statistics(&self) {
        let api = self.api.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.statistics().await;
            let _ = tx.send(Completion::Statistics(result));
        });
    }

    fn show_statistics(&mut self, stats: Statistics) {
        self.presenter.show_statistics(&stats);
        self.statistics = Some(stats);
    }
}
