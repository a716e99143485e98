//! Ring/challenge state machine.
//!
//! Like the rest of the engine it owns no threads and reads no clock: every
//! entry point takes the current [`Moment`], and the caller drives expiry
//! by calling [`ChallengeMachine::poll`] at or after
//! [`ChallengeMachine::next_deadline`]. Transitions return [`Effect`]s for
//! the caller to carry out (audio, reporting, fetches, rendering).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Ringing -> AwaitingChallengeStart -> Challenging -> Succeeded -> Idle
//!            |                                     |
//!            +-> (snooze) -> Idle                  +-> Failed   -> Ringing
//!                                                  +-> TimedOut -> Ringing
//! ```
//!
//! Every transition starts by cancelling the timers of the previous phase,
//! so a deadline armed for an earlier phase can never fire into a later one.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::countdown::Countdown;
use super::record::ChallengeRecord;
use super::timers::{TimerKind, TimerSet};
use crate::alarm::{AlarmId, AlarmRecord, AlarmRegistry, ChallengeType, ClockTime};
use crate::clock::Moment;
use crate::error::ApiError;
use crate::events::{EventKind, StatisticsEvent};
use crate::presentation::{Notice, Screen};
use crate::sound::{SoundLibrary, SoundSource};

/// Durations of the alarm flow, in milliseconds unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    /// Stop -> challenge appears.
    pub challenge_delay_ms: u64,
    /// Time allowed to answer once the prompt is shown.
    pub answer_timeout_ms: u64,
    /// Snooze offset from the current wall-clock time.
    pub snooze_minutes: u32,
    pub success_delay_ms: u64,
    pub failure_delay_ms: u64,
    pub timeout_delay_ms: u64,
    /// Wait before re-requesting a challenge that failed to load.
    pub fetch_retry_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            challenge_delay_ms: 120_000,
            answer_timeout_ms: 120_000,
            snooze_minutes: 5,
            success_delay_ms: 1_500,
            failure_delay_ms: 1_500,
            timeout_delay_ms: 3_000,
            fetch_retry_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Ringing,
    AwaitingChallengeStart,
    Challenging,
    Succeeded,
    Failed,
    TimedOut,
}

/// Identifies one challenge request so late responses can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken(u64);

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start looped playback (stopping whatever plays).
    PlaySound(SoundSource),
    StopSound,
    /// Fire-and-forget statistics event.
    Report(StatisticsEvent),
    /// Request a fresh challenge; feed the outcome to `challenge_loaded`.
    FetchChallenge {
        token: FetchToken,
        challenge_type: ChallengeType,
    },
    Present(Screen),
    Notice(Notice),
    RefreshStatistics,
}

/// The alarm currently moving through the flow.
#[derive(Debug, Clone)]
pub struct ActiveAlarmContext {
    pub alarm: AlarmRecord,
    /// Sound playing for this alarm, if any.
    pub sound: Option<SoundSource>,
    /// First ring of this alarm's cycle chain; retries keep it.
    pub first_rang_at: NaiveDateTime,
    wait: Option<Countdown>,
    answer: Option<Countdown>,
    challenge: Option<ChallengeRecord>,
    pending_fetch: Option<FetchToken>,
    fetch_failed: bool,
}

impl ActiveAlarmContext {
    fn new(alarm: AlarmRecord, first_rang_at: NaiveDateTime) -> Self {
        Self {
            alarm,
            sound: None,
            first_rang_at,
            wait: None,
            answer: None,
            challenge: None,
            pending_fetch: None,
            fetch_failed: false,
        }
    }

    pub fn challenge(&self) -> Option<&ChallengeRecord> {
        self.challenge.as_ref()
    }

    pub fn answer_countdown(&self) -> Option<&Countdown> {
        self.answer.as_ref()
    }

    pub fn wait_countdown(&self) -> Option<&Countdown> {
        self.wait.as_ref()
    }

    pub fn pending_fetch(&self) -> Option<FetchToken> {
        self.pending_fetch
    }
}

#[derive(Debug, Clone)]
pub struct ChallengeMachine {
    timings: Timings,
    sounds: SoundLibrary,
    phase: Phase,
    active: Option<ActiveAlarmContext>,
    timers: TimerSet,
    next_token: u64,
}

impl ChallengeMachine {
    pub fn new(timings: Timings, sounds: SoundLibrary) -> Self {
        Self {
            timings,
            sounds,
            phase: Phase::Idle,
            active: None,
            timers: TimerSet::new(),
            next_token: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// An alarm occupies the flow; new triggers must be refused.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveAlarmContext> {
        self.active.as_ref()
    }

    pub fn active_alarm_id(&self) -> Option<&AlarmId> {
        self.active.as_ref().map(|ctx| &ctx.alarm.id)
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Current overlay, with countdowns evaluated at `now`.
    pub fn screen(&self, now: Moment) -> Screen {
        let Some(ctx) = self.active.as_ref() else {
            return Screen::Idle;
        };
        let label = ctx.alarm.label.clone();
        match self.phase {
            Phase::Idle => Screen::Idle,
            Phase::Ringing => Screen::Ringing { label },
            Phase::AwaitingChallengeStart => match ctx.wait {
                Some(wait) => Screen::AwaitingChallenge {
                    label,
                    countdown: wait.view(now.mono_ms),
                },
                None => Screen::Ringing { label },
            },
            Phase::Challenging => Screen::Challenge {
                label,
                prompt: ctx.challenge.as_ref().map(|c| c.prompt.clone()),
                countdown: ctx.answer.map(|c| c.view(now.mono_ms)),
                loading_failed: ctx.fetch_failed,
            },
            Phase::Succeeded => Screen::Success,
            Phase::Failed => Screen::WrongAnswer,
            Phase::TimedOut => Screen::TimedOut,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enter Ringing for `alarm`, replacing the active context wholesale.
    pub fn start_ringing(&mut self, alarm: AlarmRecord, now: Moment) -> Vec<Effect> {
        let first_rang_at = match &self.active {
            Some(ctx) if ctx.alarm.id == alarm.id => ctx.first_rang_at,
            _ => now.wall,
        };
        self.timers.cancel_all();

        let mut effects = Vec::new();
        if self.active.as_ref().is_some_and(|ctx| ctx.sound.is_some()) {
            effects.push(Effect::StopSound);
        }

        let sound = self.sounds.resolve(&alarm.sound);
        tracing::info!(alarm_id = %alarm.id, time = %alarm.time, %sound, "alarm ringing");

        let mut ctx = ActiveAlarmContext::new(alarm, first_rang_at);
        ctx.sound = Some(sound.clone());
        effects.push(Effect::PlaySound(sound));
        effects.push(Self::report(&ctx, EventKind::Triggered, None));
        effects.push(Effect::Present(Screen::Ringing {
            label: ctx.alarm.label.clone(),
        }));

        self.active = Some(ctx);
        self.phase = Phase::Ringing;
        effects
    }

    /// Push the ringing alarm to `now + snooze_minutes` and go idle.
    pub fn snooze(&mut self, registry: &mut AlarmRegistry, now: Moment) -> Vec<Effect> {
        if self.phase != Phase::Ringing {
            return Vec::new();
        }
        let Some(ctx) = self.active.take() else {
            return Vec::new();
        };
        self.timers.cancel_all();
        self.phase = Phase::Idle;

        let new_time = ClockTime::after(now.wall, self.timings.snooze_minutes);
        if !registry.reschedule(&ctx.alarm.id, new_time) {
            tracing::warn!(alarm_id = %ctx.alarm.id, "snoozed alarm no longer in registry");
        }
        tracing::info!(alarm_id = %ctx.alarm.id, %new_time, "alarm snoozed");

        vec![
            Effect::StopSound,
            Self::report(&ctx, EventKind::Snoozed, None),
            Effect::Notice(Notice::success(format!(
                "Alarm snoozed for {} minutes",
                self.timings.snooze_minutes
            ))),
            Effect::Present(Screen::Idle),
        ]
    }

    /// Silence the alarm and start the unskippable wait before the challenge.
    pub fn stop(&mut self, now: Moment) -> Vec<Effect> {
        if self.phase != Phase::Ringing {
            return Vec::new();
        }
        let Some(ctx) = self.active.as_mut() else {
            return Vec::new();
        };
        self.timers.cancel_all();

        ctx.sound = None;
        ctx.wait = Some(Countdown::start(now.mono_ms, self.timings.challenge_delay_ms));
        let report = Self::report(ctx, EventKind::Stopped, None);
        self.timers
            .arm(TimerKind::ChallengeDelay, now.mono_ms, self.timings.challenge_delay_ms);
        self.phase = Phase::AwaitingChallengeStart;
        tracing::info!(alarm_id = %ctx.alarm.id, "alarm stopped; challenge pending");

        vec![report, Effect::StopSound, Effect::Present(self.screen(now))]
    }

    /// Open the challenge screen and request a fresh challenge.
    ///
    /// Normally entered when the challenge delay expires.
    pub fn start_challenge(&mut self, now: Moment) -> Vec<Effect> {
        if self.active.is_none() {
            return Vec::new();
        }
        self.timers.cancel_all();
        self.phase = Phase::Challenging;

        let mut effects = self.request_challenge();
        effects.push(Effect::Present(self.screen(now)));
        effects
    }

    /// Feed back the outcome of a `FetchChallenge` effect.
    ///
    /// The answer countdown starts here, once a prompt is available.
    pub fn challenge_loaded(
        &mut self,
        token: FetchToken,
        result: Result<ChallengeRecord, ApiError>,
        now: Moment,
    ) -> Vec<Effect> {
        let expected = self.active.as_ref().and_then(|ctx| ctx.pending_fetch);
        if self.phase != Phase::Challenging || expected != Some(token) {
            tracing::debug!(?token, "discarding stale challenge response");
            return Vec::new();
        }
        let Some(ctx) = self.active.as_mut() else {
            return Vec::new();
        };
        ctx.pending_fetch = None;

        match result {
            Ok(challenge) => {
                ctx.fetch_failed = false;
                ctx.challenge = Some(challenge);
                ctx.answer = Some(Countdown::start(now.mono_ms, self.timings.answer_timeout_ms));
                self.timers
                    .arm(TimerKind::AnswerTimeout, now.mono_ms, self.timings.answer_timeout_ms);
            }
            Err(e) => {
                tracing::warn!(alarm_id = %ctx.alarm.id, "challenge fetch failed: {e}");
                ctx.fetch_failed = true;
                self.timers
                    .arm(TimerKind::FetchRetry, now.mono_ms, self.timings.fetch_retry_ms);
            }
        }
        vec![Effect::Present(self.screen(now))]
    }

    /// Check a submitted answer. Ignored unless a challenge is on screen.
    pub fn submit(&mut self, answer: &str, now: Moment) -> Vec<Effect> {
        if self.phase != Phase::Challenging {
            return Vec::new();
        }
        let Some(ctx) = self.active.as_ref() else {
            return Vec::new();
        };
        let Some(challenge) = ctx.challenge.as_ref() else {
            return Vec::new();
        };
        self.timers.cancel_all();

        if challenge.accepts(answer) {
            let response_secs = (now.wall - ctx.first_rang_at).num_seconds().max(0) as u64;
            let report = Self::report(ctx, EventKind::Success, Some(response_secs));
            tracing::info!(alarm_id = %ctx.alarm.id, response_secs, "challenge solved");
            self.phase = Phase::Succeeded;
            self.timers
                .arm(TimerKind::Transition, now.mono_ms, self.timings.success_delay_ms);
            vec![report, Effect::Present(Screen::Success)]
        } else {
            let report = Self::report(ctx, EventKind::Failed, None);
            tracing::info!(alarm_id = %ctx.alarm.id, "wrong answer; alarm will ring again");
            self.phase = Phase::Failed;
            self.timers
                .arm(TimerKind::Transition, now.mono_ms, self.timings.failure_delay_ms);
            vec![
                report,
                Effect::Notice(Notice::error("Wrong answer! Try again")),
                Effect::Present(Screen::WrongAnswer),
            ]
        }
    }

    /// Fire every timer due at `now`, in deadline order.
    pub fn poll(&mut self, now: Moment) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some(handle) = self.timers.pop_due(now.mono_ms) {
            effects.extend(self.on_timer(handle.kind, now));
        }
        effects
    }

    /// Tear down the flow: audio, overlays, context and timers.
    pub fn dismiss(&mut self, _now: Moment) -> Vec<Effect> {
        self.timers.cancel_all();
        self.phase = Phase::Idle;
        let Some(ctx) = self.active.take() else {
            return Vec::new();
        };
        tracing::info!(alarm_id = %ctx.alarm.id, "alarm dismissed");
        vec![
            Effect::StopSound,
            Effect::Present(Screen::Idle),
            Effect::RefreshStatistics,
        ]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_timer(&mut self, kind: TimerKind, now: Moment) -> Vec<Effect> {
        match (kind, self.phase) {
            (TimerKind::ChallengeDelay, Phase::AwaitingChallengeStart) => self.start_challenge(now),
            (TimerKind::AnswerTimeout, Phase::Challenging) => self.time_out(now),
            (TimerKind::FetchRetry, Phase::Challenging) => {
                let mut effects = self.request_challenge();
                effects.push(Effect::Present(self.screen(now)));
                effects
            }
            (TimerKind::Transition, Phase::Succeeded) => self.dismiss(now),
            (TimerKind::Transition, Phase::Failed | Phase::TimedOut) => {
                match self.active.as_ref().map(|ctx| ctx.alarm.clone()) {
                    Some(alarm) => self.start_ringing(alarm, now),
                    None => Vec::new(),
                }
            }
            (kind, phase) => {
                tracing::debug!(?kind, ?phase, "ignoring timer outside its phase");
                Vec::new()
            }
        }
    }

    fn time_out(&mut self, now: Moment) -> Vec<Effect> {
        let Some(ctx) = self.active.as_ref() else {
            return Vec::new();
        };
        if ctx.challenge.is_none() {
            return Vec::new();
        }
        self.timers.cancel_all();
        let report = Self::report(ctx, EventKind::Timeout, None);
        tracing::info!(alarm_id = %ctx.alarm.id, "challenge timed out; alarm will ring again");
        self.phase = Phase::TimedOut;
        self.timers
            .arm(TimerKind::Transition, now.mono_ms, self.timings.timeout_delay_ms);
        vec![report, Effect::Present(Screen::TimedOut)]
    }

    fn request_challenge(&mut self) -> Vec<Effect> {
        let Some(ctx) = self.active.as_mut() else {
            return Vec::new();
        };
        self.next_token += 1;
        let token = FetchToken(self.next_token);
        ctx.wait = None;
        ctx.answer = None;
        ctx.challenge = None;
        ctx.fetch_failed = false;
        ctx.pending_fetch = Some(token);
        vec![Effect::FetchChallenge {
            token,
            challenge_type: ctx.alarm.challenge_type,
        }]
    }

    fn report(ctx: &ActiveAlarmContext, kind: EventKind, response_time: Option<u64>) -> Effect {
        Effect::Report(StatisticsEvent {
            alarm_id: ctx.alarm.id.clone(),
            event: kind,
            response_time,
        })
    }
}
