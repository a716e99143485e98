//! Alarm records as held by the client.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::time::ClockTime;
use crate::error::ValidationError;

/// Server-assigned alarm identifier.
///
/// Opaque to the client. The server emits integers; strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlarmId(String);

impl AlarmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build from a JSON scalar; `None` for anything that is not a number or
    /// a non-empty string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }

    /// JSON form sent back to the server: numeric ids stay numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self.0.parse::<i64>() {
            Ok(n) => serde_json::Value::from(n),
            Err(_) => serde_json::Value::String(self.0.clone()),
        }
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AlarmId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AlarmId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).ok_or_else(|| serde::de::Error::custom("invalid alarm id"))
    }
}

/// Kind of wake-up challenge an alarm demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Math,
    #[default]
    Sentence,
}

impl ChallengeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeType::Math => "math",
            ChallengeType::Sentence => "sentence",
        }
    }

    /// Lenient parse for untrusted input; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "math" => Some(ChallengeType::Math),
            "sentence" => Some(ChallengeType::Sentence),
            _ => None,
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_LABEL: &str = "Alarm";
pub const DEFAULT_SOUND: &str = "default";

/// One alarm as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: AlarmId,
    pub time: ClockTime,
    pub label: String,
    pub challenge_type: ChallengeType,
    /// Uploaded sound path/URL or a named preset.
    pub sound: String,
    pub enabled: bool,
    /// Client-only: set once the trigger fired during the current matching minute.
    #[serde(skip)]
    pub fired_this_minute: bool,
}

/// Parameters for creating an alarm, validated before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAlarm {
    pub time: ClockTime,
    pub label: String,
    pub challenge_type: ChallengeType,
    pub sound: String,
    pub enabled: bool,
}

impl NewAlarm {
    /// Build from raw form fields. The time is required; everything else
    /// falls back to the same defaults the server applies.
    pub fn from_form(
        time: &str,
        label: Option<&str>,
        challenge_type: Option<&str>,
        sound: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if time.trim().is_empty() {
            return Err(ValidationError::MissingField("Time".into()));
        }
        let time: ClockTime = time.parse()?;
        let challenge_type = match challenge_type.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => ChallengeType::parse(raw).ok_or_else(|| ValidationError::InvalidValue {
                field: "challenge_type".into(),
                message: format!("expected math or sentence, got '{raw}'"),
            })?,
            None => ChallengeType::default(),
        };
        Ok(Self {
            time,
            label: non_empty_or(label, DEFAULT_LABEL),
            challenge_type,
            sound: non_empty_or(sound, DEFAULT_SOUND),
            enabled: true,
        })
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
