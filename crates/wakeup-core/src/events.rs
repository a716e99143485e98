use serde::{Deserialize, Serialize};

use crate::alarm::AlarmId;

/// Alarm-flow transitions reported to the statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Triggered,
    Snoozed,
    Stopped,
    Success,
    Failed,
    Timeout,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Triggered => "triggered",
            EventKind::Snoozed => "snoozed",
            EventKind::Stopped => "stopped",
            EventKind::Success => "success",
            EventKind::Failed => "failed",
            EventKind::Timeout => "timeout",
        }
    }
}

/// Body of `POST /api/statistics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub alarm_id: AlarmId,
    pub event: EventKind,
    /// Seconds from the first ring to a correct answer; success only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
}
