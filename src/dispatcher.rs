//! Action dispatch
//!
//! Maps stable gestures and combo keys to bound shell commands and applies
//! the firing cooldown. Launching goes through the [`CommandLauncher`] trait
//! so the cooldown and combo policy can be exercised without spawning
//! processes.

use crate::combo::ComboTracker;
use crate::error::GestureError;
use crate::notifier::{Notification, Notifier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default minimum interval between repeated firings of the same gesture
pub const DEFAULT_ACTION_COOLDOWN: Duration = Duration::from_secs(1);

/// Key (gesture name or combo) to command template bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionBindings {
    commands: HashMap<String, String>,
}

impl ActionBindings {
    pub fn new(commands: HashMap<String, String>) -> Self {
        Self { commands }
    }

    /// Parse an action configuration object (`key -> command`)
    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.commands.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<(String, String)> for ActionBindings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One command launch, captured by value for the background thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionLaunch {
    pub launch_id: Uuid,
    /// Gesture name or combo key that triggered the launch
    pub trigger: String,
    /// Command template as configured
    pub command: String,
    pub launched_at: DateTime<Utc>,
}

impl ActionLaunch {
    pub fn new(trigger: &str, command: &str) -> Self {
        Self {
            launch_id: Uuid::new_v4(),
            trigger: trigger.to_string(),
            command: command.to_string(),
            launched_at: Utc::now(),
        }
    }
}

/// Trait for starting bound commands without blocking the caller
pub trait CommandLauncher {
    fn launch(&self, launch: ActionLaunch) -> Result<(), GestureError>;
}

/// Runs commands through `sh -c` and notifies once each one exits
pub struct ShellLauncher {
    notifier: Arc<dyn Notifier + Send + Sync>,
}

impl ShellLauncher {
    pub fn new(notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        Self { notifier }
    }
}

impl CommandLauncher for ShellLauncher {
    fn launch(&self, launch: ActionLaunch) -> Result<(), GestureError> {
        let expanded = expand_env(&launch.command, |name| std::env::var(name).ok());

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&expanded)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GestureError::LaunchError {
                command: launch.command.clone(),
                reason: e.to_string(),
            })?;

        debug!(launch_id = %launch.launch_id, pid = child.id(), "command started");

        let notifier = Arc::clone(&self.notifier);
        thread::spawn(move || {
            match child.wait() {
                Ok(status) => {
                    debug!(launch_id = %launch.launch_id, %status, "command finished")
                }
                Err(e) => warn!(launch_id = %launch.launch_id, "failed to wait for command: {}", e),
            }

            let notification = Notification::for_action(&launch.trigger, &launch.command);
            if let Err(e) = notifier.notify(&notification) {
                warn!(launch_id = %launch.launch_id, "{}", e);
            }
        });

        Ok(())
    }
}

/// Result of dispatching one stable-gesture event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The combo key was bound and fired; the combo was reset. A fresh
    /// sequence's key is the bare gesture name.
    ComboFired { key: String },
    /// The bare gesture was bound and fired
    GestureFired { key: String },
    /// The bare gesture was bound but is still cooling down
    CoolingDown { key: String, remaining: Duration },
    /// Neither the combo nor the gesture is bound
    Unbound { combo: String },
}

impl DispatchOutcome {
    pub fn fired(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::ComboFired { .. } | DispatchOutcome::GestureFired { .. }
        )
    }
}

/// Record of the last fired action, used for cooldown gating
#[derive(Debug, Clone, PartialEq, Eq)]
struct LastFired {
    key: String,
    at: Instant,
}

/// Decides what to run for each stable-gesture event
pub struct ActionDispatcher {
    bindings: ActionBindings,
    cooldown: Duration,
    last_fired: Option<LastFired>,
    launcher: Box<dyn CommandLauncher>,
}

impl ActionDispatcher {
    pub fn new(
        bindings: ActionBindings,
        cooldown: Duration,
        launcher: Box<dyn CommandLauncher>,
    ) -> Self {
        Self {
            bindings,
            cooldown,
            last_fired: None,
            launcher,
        }
    }

    pub fn bindings(&self) -> &ActionBindings {
        &self.bindings
    }

    /// Key of the most recently fired action
    pub fn last_fired_key(&self) -> Option<&str> {
        self.last_fired.as_ref().map(|l| l.key.as_str())
    }

    /// Handle a new stable gesture from the primary hand.
    ///
    /// Extends the combo sequence, then fires the combo key if it is bound,
    /// or else the bare gesture if it is bound and not cooling down.
    pub fn dispatch(
        &mut self,
        gesture: &str,
        combo: &mut ComboTracker,
        now: Instant,
    ) -> DispatchOutcome {
        let combo_key = combo.update(gesture, now);
        info!(gesture, combo = %combo_key, "new stable gesture");

        if let Some(command) = self.bindings.get(&combo_key).map(str::to_string) {
            info!(combo = %combo_key, %command, "executing combo action");
            self.fire(&combo_key, &command, now);
            combo.reset();
            return DispatchOutcome::ComboFired { key: combo_key };
        }

        let Some(command) = self.bindings.get(gesture).map(str::to_string) else {
            return DispatchOutcome::Unbound { combo: combo_key };
        };

        if let Some(last) = &self.last_fired {
            let elapsed = now.saturating_duration_since(last.at);
            if last.key == gesture && elapsed <= self.cooldown {
                debug!(gesture, ?elapsed, "action cooling down");
                return DispatchOutcome::CoolingDown {
                    key: gesture.to_string(),
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        info!(gesture, %command, "executing action");
        self.fire(gesture, &command, now);
        DispatchOutcome::GestureFired {
            key: gesture.to_string(),
        }
    }

    /// Launch and record. The record is kept even if the launch fails.
    fn fire(&mut self, key: &str, command: &str, now: Instant) {
        if let Err(e) = self.launcher.launch(ActionLaunch::new(key, command)) {
            warn!("{}", e);
        }
        self.last_fired = Some(LastFired {
            key: key.to_string(),
            at: now,
        });
    }
}

/// Human-readable command label: the executable's base name without arguments
pub fn command_label(command: &str) -> String {
    match command.split_whitespace().next() {
        Some(program) => Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string()),
        None => command.to_string(),
    }
}

/// Expand `$NAME` and `${NAME}` using `lookup`. Unset variables expand to
/// an empty string; a `$` not followed by a name is kept as is.
pub fn expand_env<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let rest = &template[i + 1..];
        if let Some(braced) = rest.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                let name = &braced[..end];
                out.push_str(&lookup(name).unwrap_or_default());
                // Skip "{name}"
                for _ in 0..name.chars().count() + 2 {
                    chars.next();
                }
                continue;
            }
        }

        let name_len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        if name_len == 0 {
            out.push('$');
            continue;
        }

        out.push_str(&lookup(&rest[..name_len]).unwrap_or_default());
        for _ in 0..name_len {
            chars.next();
        }
    }

    out
}
