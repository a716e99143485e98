//! Visible countdowns for the waiting and challenge screens.

use serde::{Deserialize, Serialize};

/// Visual escalation of the answer countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// More than 60 seconds left.
    Normal,
    /// 31 to 60 seconds left.
    Warning,
    /// 30 seconds or less; rendered pulsing.
    Urgent,
}

impl Urgency {
    pub fn for_remaining(remaining_secs: u64) -> Self {
        match remaining_secs {
            0..=30 => Urgency::Urgent,
            31..=60 => Urgency::Warning,
            _ => Urgency::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total_ms: u64,
    deadline_ms: u64,
}

impl Countdown {
    pub fn start(now_ms: u64, total_ms: u64) -> Self {
        Self {
            total_ms,
            deadline_ms: now_ms + total_ms,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.total_ms.div_ceil(1000)
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    /// Whole seconds left, rounded up so a fresh countdown shows its full length.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.deadline_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    pub fn view(&self, now_ms: u64) -> CountdownView {
        let remaining_secs = self.remaining_secs(now_ms);
        CountdownView {
            remaining_secs,
            display: format_mss(remaining_secs),
            urgency: Urgency::for_remaining(remaining_secs),
        }
    }
}

/// Render-ready snapshot of a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownView {
    pub remaining_secs: u64,
    /// `m:ss`
    pub display: String,
    pub urgency: Urgency,
}

pub fn format_mss(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
