//! Lenient decoding of server responses.
//!
//! Responses are untrusted: missing or mistyped fields fall back to safe
//! defaults, and only entries that cannot be used at all are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alarm::{AlarmId, AlarmRecord, ChallengeType, ClockTime, DEFAULT_LABEL, DEFAULT_SOUND};
use crate::error::ApiError;

/// Aggregates served by `GET /api/statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_alarms: u64,
    pub successful_wakeups: u64,
    pub failed_attempts: u64,
    pub streak: u64,
    #[serde(default)]
    pub total_snoozes: u64,
    /// Mean seconds from ring to correct answer, when known.
    #[serde(default)]
    pub average_response_time: Option<u64>,
}

impl Statistics {
    pub fn from_json(body: &Value) -> Self {
        let count = |key: &str| body.get(key).and_then(as_count).unwrap_or(0);
        Self {
            total_alarms: count("total_alarms"),
            successful_wakeups: count("successful_wakeups"),
            failed_attempts: count("failed_attempts"),
            streak: count("streak"),
            total_snoozes: count("total_snoozes"),
            average_response_time: body.get("average_response_time").and_then(as_count),
        }
    }
}

/// One entry of `GET /api/user_sounds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub id: Option<String>,
    pub url: String,
    pub name: String,
}

impl SoundEntry {
    pub fn from_json(body: &Value) -> Option<Self> {
        let url = body.get("url")?.as_str()?.trim();
        if url.is_empty() {
            return None;
        }
        let name = body
            .get("original_name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(url);
        Some(Self {
            id: body.get("id").and_then(AlarmId::from_json).map(|id| id.to_string()),
            url: url.to_string(),
            name: name.to_string(),
        })
    }
}

/// Decode one alarm. `None` when it lacks a usable id or time.
pub fn parse_alarm(body: &Value) -> Option<AlarmRecord> {
    let id = body.get("id").and_then(AlarmId::from_json)?;
    let time = match body.get("time").and_then(Value::as_str).map(str::parse::<ClockTime>) {
        Some(Ok(time)) => time,
        _ => {
            tracing::warn!(alarm_id = %id, "skipping alarm with invalid time");
            return None;
        }
    };
    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    Some(AlarmRecord {
        id,
        time,
        label: text("label").unwrap_or(DEFAULT_LABEL).to_string(),
        challenge_type: text("challenge_type")
            .and_then(ChallengeType::parse)
            .unwrap_or_default(),
        sound: text("sound").unwrap_or(DEFAULT_SOUND).to_string(),
        enabled: body.get("enabled").and_then(as_flag).unwrap_or(true),
        fired_this_minute: false,
    })
}

pub fn parse_alarm_list(body: &Value) -> Result<Vec<AlarmRecord>, ApiError> {
    let items = body
        .as_array()
        .ok_or_else(|| ApiError::Malformed("expected an array of alarms".into()))?;
    Ok(items.iter().filter_map(parse_alarm).collect())
}

pub fn parse_sound_list(body: &Value) -> Result<Vec<SoundEntry>, ApiError> {
    let items = body
        .as_array()
        .ok_or_else(|| ApiError::Malformed("expected an array of sounds".into()))?;
    Ok(items.iter().filter_map(SoundEntry::from_json).collect())
}

/// `{error: "..."}` payload, if present.
pub fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn as_count(v: &Value) -> Option<u64> {
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}
