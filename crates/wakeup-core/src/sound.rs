//! Alarm sound resolution and looped playback.
//!
//! An explicit uploaded sound (a `/...` path or an `http(s)` URL) wins over a
//! named preset. Anything unresolvable plays the default preset.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use url::Url;

/// A resolved, playable sound location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundSource(String);

impl SoundSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn default_presets() -> BTreeMap<String, String> {
    ["default", "gentle", "intense", "birds"]
        .into_iter()
        .map(|name| (name.to_string(), format!("/static/sounds/{name}.mp3")))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SoundLibrary {
    base_url: Option<Url>,
    presets: BTreeMap<String, String>,
    default_preset: String,
}

impl Default for SoundLibrary {
    fn default() -> Self {
        Self {
            base_url: None,
            presets: default_presets(),
            default_preset: "default".into(),
        }
    }
}

impl SoundLibrary {
    pub fn new(base_url: Option<Url>, presets: BTreeMap<String, String>, default_preset: impl Into<String>) -> Self {
        Self {
            base_url,
            presets,
            default_preset: default_preset.into(),
        }
    }

    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn resolve(&self, reference: &str) -> SoundSource {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return SoundSource::new(reference);
        }
        if reference.starts_with('/') {
            return self.absolute(reference);
        }
        match self.presets.get(reference) {
            Some(path) => self.absolute(path),
            None => self.fallback(),
        }
    }

    fn fallback(&self) -> SoundSource {
        let path = self
            .presets
            .get(&self.default_preset)
            .cloned()
            .unwrap_or_else(|| "/static/sounds/default.mp3".to_string());
        self.absolute(&path)
    }

    fn absolute(&self, path: &str) -> SoundSource {
        match self.base_url.as_ref().and_then(|base| base.join(path).ok()) {
            Some(url) => SoundSource::new(url.to_string()),
            None => SoundSource::new(path),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Platform refuses to start audio until the user interacts.
    #[error("playback blocked until user interaction")]
    Blocked,

    #[error("audio unavailable: {0}")]
    Unavailable(String),
}

/// Output device for alarm audio.
pub trait AudioSink {
    /// Start `source` looping until `stop()`.
    fn play_looped(&mut self, source: &SoundSource) -> Result<(), PlaybackError>;

    fn stop(&mut self);
}

/// Wraps an [`AudioSink`], deferring blocked playback to the next interaction.
#[derive(Debug)]
pub struct Player<S> {
    sink: S,
    current: Option<SoundSource>,
    deferred: bool,
}

impl<S: AudioSink> Player<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            current: None,
            deferred: false,
        }
    }

    pub fn play(&mut self, source: SoundSource) {
        self.stop();
        match self.sink.play_looped(&source) {
            Ok(()) => {
                self.current = Some(source);
            }
            Err(PlaybackError::Blocked) => {
                tracing::debug!(sound = %source, "playback blocked; retrying on next interaction");
                self.current = Some(source);
                self.deferred = true;
            }
            Err(e) => {
                tracing::warn!(sound = %source, "alarm sound failed: {e}");
            }
        }
    }

    pub fn stop(&mut self) {
        if self.current.take().is_some() {
            self.sink.stop();
        }
        self.deferred = false;
    }

    /// Any user input anywhere: retry a blocked playback.
    pub fn on_user_interaction(&mut self) {
        if !self.deferred {
            return;
        }
        let Some(source) = self.current.clone() else {
            self.deferred = false;
            return;
        };
        match self.sink.play_looped(&source) {
            Ok(()) => self.deferred = false,
            Err(PlaybackError::Blocked) => {}
            Err(e) => {
                tracing::warn!(sound = %source, "alarm sound failed: {e}");
                self.current = None;
                self.deferred = false;
            }
        }
    }

    pub fn current(&self) -> Option<&SoundSource> {
        self.current.as_ref()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
