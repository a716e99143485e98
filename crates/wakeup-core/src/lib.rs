//! # Wakeup Core Library
//!
//! This library provides the core logic for the Wakeup alarm clock: alarms
//! that ring at a wall-clock minute and can only be dismissed by solving a
//! challenge served by the alarm server.
//!
//! ## Architecture
//!
//! - **Trigger Engine**: matches the local `HH:MM` minute against enabled
//!   alarms, firing each alarm at most once per matching minute
//! - **Challenge Machine**: a wall-clock state machine that owns no threads;
//!   the caller passes the current [`Moment`] in and carries out the returned
//!   [`Effect`]s
//! - **API**: the alarm server behind the [`AlarmApi`] trait, with a reqwest
//!   implementation in [`HttpApi`]
//! - **Controller**: a single tokio task that drives everything
//! - **Storage**: TOML-based client configuration
//!
//! ## Key Components
//!
//! - [`TriggerEngine`]: Per-minute alarm matching
//! - [`ChallengeMachine`]: Ring/stop/challenge/result flow
//! - [`AlarmController`]: Async driver over API, audio and presentation
//! - [`Config`]: Client configuration management

pub mod alarm;
pub mod api;
pub mod challenge;
pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod presentation;
pub mod reporter;
pub mod sound;
pub mod storage;
pub mod trigger;

pub use alarm::{AlarmId, AlarmRecord, AlarmRegistry, ChallengeType, ClockTime, Meridiem, NewAlarm};
pub use api::{AlarmApi, HttpApi, SoundEntry, Statistics};
pub use challenge::{ChallengeMachine, ChallengeRecord, Effect, Phase, Timings};
pub use clock::{Clock, ManualClock, Moment, SystemClock};
pub use controller::{AlarmController, Completion, UserInput};
pub use error::{ApiError, ConfigError, CoreError, ValidationError};
pub use events::{EventKind, StatisticsEvent};
pub use presentation::{Notice, NoticeLevel, Presenter, Screen};
pub use sound::{AudioSink, PlaybackError, Player, SoundLibrary, SoundSource};
pub use storage::Config;
pub use trigger::TriggerEngine;
