//! What the user sees, independent of how it is drawn.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmRegistry;
use crate::api::Statistics;
use crate::challenge::CountdownView;

/// One full-screen overlay state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Idle,
    /// Audio playing; only Snooze and Stop are offered.
    Ringing { label: String },
    /// Fixed wait between Stop and the challenge. Cannot be skipped.
    AwaitingChallenge { label: String, countdown: CountdownView },
    Challenge {
        label: String,
        /// `None` while the challenge is still being fetched.
        prompt: Option<String>,
        /// Starts only once the prompt is available.
        countdown: Option<CountdownView>,
        /// Set when fetching failed and a retry is pending.
        loading_failed: bool,
    },
    WrongAnswer,
    Success,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Rendering backend. Only `render` is mandatory.
pub trait Presenter {
    fn render(&mut self, screen: &Screen);

    /// Called once per second with the local time.
    fn show_time(&mut self, _now: NaiveDateTime) {}

    fn notice(&mut self, _notice: &Notice) {}

    fn show_alarms(&mut self, _alarms: &AlarmRegistry) {}

    fn show_statistics(&mut self, _stats: &Statistics) {}
}
