//! Error types for Gestura

use thiserror::Error;

/// Errors that can occur while loading configuration, reading frames or
/// launching actions
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: String, reason: String },

    #[error("Failed to start vision helper: {0}")]
    HelperStartError(String),

    #[error("Vision helper reported an error: {0}")]
    HelperReported(String),

    #[error("Failed to launch command '{command}': {reason}")]
    LaunchError { command: String, reason: String },

    #[error("Failed to deliver notification: {0}")]
    NotificationError(String),
}

impl GestureError {
    /// Whether the run loop must stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GestureError::HelperStartError(_) | GestureError::HelperReported(_)
        )
    }
}
