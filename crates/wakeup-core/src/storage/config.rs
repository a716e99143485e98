//! TOML-based client configuration.
//!
//! Stores:
//! - Alarm server location and request timeout
//! - Alarm flow durations (challenge delay, answer window, snooze)
//! - Sound presets and the fallback preset
//!
//! Configuration is stored at `~/.config/wakeup/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::data_dir;
use crate::challenge::Timings;
use crate::error::{ConfigError, Result};
use crate::sound::{default_presets, SoundLibrary};

/// Alarm server connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Alarm flow durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_two_minutes")]
    pub challenge_delay_secs: u64,
    #[serde(default = "default_two_minutes")]
    pub answer_timeout_secs: u64,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    #[serde(default = "default_result_delay")]
    pub success_delay_ms: u64,
    #[serde(default = "default_result_delay")]
    pub failure_delay_ms: u64,
    #[serde(default = "default_timeout_delay")]
    pub timeout_delay_ms: u64,
    #[serde(default = "default_fetch_retry")]
    pub fetch_retry_ms: u64,
}

/// Sound presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundsConfig {
    #[serde(default = "default_preset")]
    pub default_preset: String,
    /// Preset name -> server path or URL.
    #[serde(default = "default_presets")]
    pub presets: BTreeMap<String, String>,
}

/// Client configuration.
///
/// Serialized to/from TOML at `~/.config/wakeup/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timings: TimingsConfig,
    #[serde(default)]
    pub sounds: SoundsConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:5000".into()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_two_minutes() -> u64 {
    120
}
fn default_snooze_minutes() -> u32 {
    5
}
fn default_result_delay() -> u64 {
    1_500
}
fn default_timeout_delay() -> u64 {
    3_000
}
fn default_fetch_retry() -> u64 {
    5_000
}
fn default_preset() -> String {
    "default".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            challenge_delay_secs: default_two_minutes(),
            answer_timeout_secs: default_two_minutes(),
            snooze_minutes: default_snooze_minutes(),
            success_delay_ms: default_result_delay(),
            failure_delay_ms: default_result_delay(),
            timeout_delay_ms: default_timeout_delay(),
            fetch_retry_ms: default_fetch_retry(),
        }
    }
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
            presets: default_presets(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?
                        .into(),
                ),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Persist to the standard location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default configuration: {e}");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update one value in memory. The result must pass [`Config::validate`];
    /// on error `self` is left untouched.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value is invalid,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        let url = Url::parse(&self.server.base_url)
            .map_err(|e| invalid("server.base_url", &e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("server.base_url", "expected an http(s) URL"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be positive"));
        }

        let t = &self.timings;
        let durations = [
            ("timings.challenge_delay_secs", t.challenge_delay_secs),
            ("timings.answer_timeout_secs", t.answer_timeout_secs),
            ("timings.snooze_minutes", u64::from(t.snooze_minutes)),
            ("timings.success_delay_ms", t.success_delay_ms),
            ("timings.failure_delay_ms", t.failure_delay_ms),
            ("timings.timeout_delay_ms", t.timeout_delay_ms),
            ("timings.fetch_retry_ms", t.fetch_retry_ms),
        ];
        if let Some((key, _)) = durations.iter().find(|(_, v)| *v == 0) {
            return Err(invalid(key, "must be positive"));
        }
        if t.snooze_minutes >= 24 * 60 {
            return Err(invalid("timings.snooze_minutes", "must be less than a day"));
        }

        if !self.sounds.presets.contains_key(&self.sounds.default_preset) {
            return Err(invalid("sounds.default_preset", "no preset with that name"));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "server.base_url".into(),
            message: e.to_string(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn timings(&self) -> Timings {
        let t = &self.timings;
        Timings {
            challenge_delay_ms: t.challenge_delay_secs * 1_000,
            answer_timeout_ms: t.answer_timeout_secs * 1_000,
            snooze_minutes: t.snooze_minutes,
            success_delay_ms: t.success_delay_ms,
            failure_delay_ms: t.failure_delay_ms,
            timeout_delay_ms: t.timeout_delay_ms,
            fetch_retry_ms: t.fetch_retry_ms,
        }
    }

    /// Presets resolved against the server base URL.
    pub fn sound_library(&self) -> SoundLibrary {
        SoundLibrary::new(
            self.base_url().ok(),
            self.sounds.presets.clone(),
            self.sounds.default_preset.clone(),
        )
    }
}
