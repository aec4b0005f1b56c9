//! Vision helper subprocess
//!
//! The helper is a Python program that reads the webcam, runs hand landmark
//! detection and writes one JSON [`FrameMessage`](crate::types::FrameMessage)
//! per line on stdout. Its stderr passes straight through to ours.
//!
//! [`ShutdownHandle`] is shared between the frame loop and the interrupt
//! listener; whichever asks first kills and reaps the child, later calls do
//! nothing.

use crate::config::HelperConfig;
use crate::error::GestureError;
use std::io::BufReader;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A running vision helper
pub struct VisionHelper {
    stdout: BufReader<ChildStdout>,
    handle: ShutdownHandle,
}

impl VisionHelper {
    /// Start the helper. `debug` asks it to include camera frames.
    pub fn spawn(config: &HelperConfig, debug: bool) -> Result<Self, GestureError> {
        if !config.python.exists() {
            return Err(GestureError::HelperStartError(format!(
                "python interpreter not found at '{}'",
                config.python.display()
            )));
        }

        let mut command = Command::new(&config.python);
        command
            .arg(&config.script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if debug {
            command.arg("--debug");
        }

        let mut child = command
            .spawn()
            .map_err(|e| GestureError::HelperStartError(e.to_string()))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(GestureError::HelperStartError(
                "helper stdout was not captured".to_string(),
            ));
        };

        info!(pid = child.id(), script = %config.script.display(), "vision helper started");

        Ok(Self {
            stdout: BufReader::new(stdout),
            handle: ShutdownHandle::new(child),
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Split into the line reader and the shutdown handle
    pub fn into_parts(self) -> (BufReader<ChildStdout>, ShutdownHandle) {
        (self.stdout, self.handle)
    }
}

struct ShutdownState {
    child: Mutex<Option<Child>>,
    requested: AtomicBool,
}

impl Drop for ShutdownState {
    fn drop(&mut self) {
        let child = match self.child.get_mut() {
            Ok(child) => child.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(child) = child {
            reap(child);
        }
    }
}

/// Cloneable, thread-safe handle that stops the helper exactly once
#[derive(Clone)]
pub struct ShutdownHandle {
    state: Arc<ShutdownState>,
}

impl ShutdownHandle {
    fn new(child: Child) -> Self {
        Self::from_child(Some(child))
    }

    fn from_child(child: Option<Child>) -> Self {
        Self {
            state: Arc::new(ShutdownState {
                child: Mutex::new(child),
                requested: AtomicBool::new(false),
            }),
        }
    }

    /// Handle with no process attached; only records the request
    pub fn detached() -> Self {
        Self::from_child(None)
    }

    /// Whether shutdown has been asked for
    pub fn is_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    /// Kill and reap the helper. Returns `true` only for the call that
    /// actually stopped it.
    pub fn shutdown(&self) -> bool {
        self.state.requested.store(true, Ordering::SeqCst);

        let child = match self.state.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match child {
            Some(child) => {
                reap(child);
                true
            }
            None => false,
        }
    }
}

fn reap(mut child: Child) {
    let pid = child.id();
    if let Err(e) = child.kill() {
        // Already exited on its own
        debug!(pid, "kill failed: {}", e);
    }
    match child.wait() {
        Ok(status) => info!(pid, %status, "vision helper stopped"),
        Err(e) => warn!(pid, "failed to reap vision helper: {}", e),
    }
}
