//! Post-action notifications
//!
//! The dispatcher only decides what to announce. Delivery is behind the
//! [`Notifier`] trait: [`LogNotifier`] writes to the log, [`DesktopNotifier`]
//! hands the message to `notify-send`.

use crate::dispatcher::command_label;
use crate::error::GestureError;
use serde::Serialize;
use std::process::{Command, Stdio};
use tracing::info;

/// Application name shown by the desktop notification daemon
pub const APP_NAME: &str = "Gestura";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Describe a finished action: the triggering gesture and the program run
    pub fn for_action(trigger: &str, command: &str) -> Self {
        Self {
            title: format!("{}: '{}' triggered", APP_NAME, trigger),
            message: format!("Running: {}", command_label(command)),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<(), GestureError>;
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), GestureError> {
        info!(title = %notification.title, "{}", notification.message);
        Ok(())
    }
}

/// Sends notifications through the freedesktop `notify-send` tool
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            program: "notify-send".to_string(),
        }
    }
}

impl DesktopNotifier {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), GestureError> {
        let status = Command::new(&self.program)
            .arg("--app-name")
            .arg(APP_NAME)
            .arg(&notification.title)
            .arg(&notification.message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| GestureError::NotificationError(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(GestureError::NotificationError(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}
