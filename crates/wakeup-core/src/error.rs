//! Core error types for wakeup-core.
//!
//! This module defines the error hierarchy using thiserror. None of these
//! errors is fatal to the alarm flow: the controller logs or surfaces them
//! and the state machine always has a defined next state.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wakeup-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Server/collaborator errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors talking to the alarm server.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, body decode)
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered with an `{error}` payload
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// Response did not carry the fields the client needs
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Endpoint could not be built from the configured base URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors, raised before any network call is made.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Required form field left empty
    #[error("{0} required")]
    MissingField(String),

    /// Alarm time is not a valid clock time
    #[error("Invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
