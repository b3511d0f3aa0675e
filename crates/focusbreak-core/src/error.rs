//! Core error types for focusbreak-core.
//!
//! Errors are split by how far they are allowed to travel: validation and
//! permission errors are returned to the caller, channel errors never leave
//! the notification dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusbreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Permission errors (audio trial, system notifications)
    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Dot-path key does not exist
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Name of the offending field, if the error is about a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } => Some(field),
            ValidationError::EmptyCollection(_) => None,
        }
    }
}

/// A capability the user (or the platform) refused.
///
/// Never fatal: the related flag simply stays off.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The audio trial playback failed
    #[error("Audio playback is not available: {0}")]
    Audio(String),

    /// The platform reports notifications as denied
    #[error("System notifications were denied")]
    NotificationsDenied,

    /// The permission request itself failed
    #[error("Notification permission request failed: {0}")]
    Notifications(String),

    /// The request was dropped before it completed
    #[error("Permission request was cancelled")]
    Cancelled,
}

/// Failure of a single notification channel.
///
/// Contained by the dispatcher; recorded in its report and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{channel} channel failed: {message}")]
pub struct ChannelError {
    pub channel: &'static str,
    pub message: String,
}

impl ChannelError {
    pub fn new(channel: &'static str, message: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
        }
    }
}

impl From<tokio::task::JoinError> for PermissionError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            PermissionError::Cancelled
        } else {
            PermissionError::Notifications(err.to_string())
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
