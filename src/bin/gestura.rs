//! Gestura CLI - runs the vision helper and acts on recognized gestures
//!
//! Headless by default: the current gesture of each tracked hand is shown on
//! a single status line when stderr is a terminal. `--debug` asks the helper
//! for camera frames and switches to the debug overlay.

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

use gestura::types::HandReport;
use gestura::{
    AppConfig, DebugOverlay, DesktopNotifier, FrameObserver, GestureEngine, GestureError,
    HelperConfig, RunSummary, Session, ShellLauncher, ShutdownHandle, VisionHelper,
    GESTURA_VERSION,
};

/// Gestura - hand gestures to desktop actions
#[derive(Parser)]
#[command(name = "gestura")]
#[command(version = GESTURA_VERSION)]
#[command(about = "Recognize hand gestures from a webcam and run bound commands", long_about = None)]
struct Cli {
    /// Show the debug overlay and ask the helper for camera frames
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gestura=info".into()),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GesturaCliError> {
    info!("gestura v{} starting", GESTURA_VERSION);

    let config = AppConfig::load(&AppConfig::default_dir())?;
    let launcher = ShellLauncher::new(Arc::new(DesktopNotifier::default()));
    let engine = GestureEngine::new(config, Box::new(launcher));

    let helper = VisionHelper::spawn(&HelperConfig::from_env(), cli.debug)?;
    let (reader, shutdown) = helper.into_parts();
    install_interrupt_handler(shutdown.clone())?;

    let observer = if cli.debug {
        Observer::Overlay(DebugOverlay::new())
    } else {
        Observer::Status(StatusLine::new(atty::is(atty::Stream::Stderr)))
    };

    let mut session = Session::new(engine, observer).with_shutdown(shutdown);
    let result = session.run(reader);
    session.close();

    log_summary(session.summary());
    result.map(|_| ()).map_err(GesturaCliError::from)
}

/// Stop the helper on Ctrl-C from a dedicated signal thread
fn install_interrupt_handler(shutdown: ShutdownHandle) -> Result<(), GesturaCliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("gestura-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Interrupt received, shutting down");
                        shutdown.shutdown();
                    }
                    Err(e) => warn!("failed to listen for interrupt: {}", e),
                }
            })
        })?;

    Ok(())
}

fn log_summary(summary: &RunSummary) {
    match serde_json::to_string(summary) {
        Ok(json) => info!("Run summary: {}", json),
        Err(e) => error!("failed to serialize run summary: {}", e),
    }
}

// ============================================================================
// Observers
// ============================================================================

enum Observer {
    Overlay(DebugOverlay),
    Status(StatusLine),
}

impl FrameObserver for Observer {
    fn observe(&mut self, hands: &[HandReport], has_image: bool) {
        match self {
            Observer::Overlay(overlay) => overlay.observe(hands, has_image),
            Observer::Status(status) => status.observe(hands, has_image),
        }
    }

    fn close(&mut self) {
        match self {
            Observer::Overlay(overlay) => overlay.close(),
            Observer::Status(status) => status.close(),
        }
    }
}

/// Single-line, carriage-return refreshed status on a terminal
struct StatusLine {
    enabled: bool,
    written: bool,
}

impl StatusLine {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            written: false,
        }
    }
}

impl FrameObserver for StatusLine {
    fn observe(&mut self, hands: &[HandReport], _has_image: bool) {
        if !self.enabled || hands.is_empty() {
            return;
        }

        let line = hands
            .iter()
            .map(|h| {
                format!(
                    "Hand {} ({}) | Raw: {} -> Stable: {}",
                    h.slot,
                    h.handedness.as_str(),
                    h.raw_gesture.as_deref().unwrap_or("None"),
                    h.stable_gesture.as_deref().unwrap_or("None"),
                )
            })
            .collect::<Vec<_>>()
            .join("   ");

        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{:<100}", line);
        let _ = stderr.flush();
        self.written = true;
    }

    fn close(&mut self) {
        if self.written {
            eprintln!();
            self.written = false;
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum GesturaCliError {
    Io(io::Error),
    Gesture(GestureError),
}

impl From<io::Error> for GesturaCliError {
    fn from(e: io::Error) -> Self {
        GesturaCliError::Io(e)
    }
}

impl From<GestureError> for GesturaCliError {
    fn from(e: GestureError) -> Self {
        GesturaCliError::Gesture(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GesturaCliError> for CliError {
    fn from(e: GesturaCliError) -> Self {
        let message = match &e {
            GesturaCliError::Io(e) => e.to_string(),
            GesturaCliError::Gesture(e) => e.to_string(),
        };

        let (code, hint) = match e {
            GesturaCliError::Io(_) => ("IO_ERROR", None),
            GesturaCliError::Gesture(GestureError::ConfigError { .. })
            | GesturaCliError::Gesture(GestureError::JsonError(_)) => (
                "CONFIG_ERROR",
                Some("Check gestures.json, actions.json and settings.json syntax"),
            ),
            GesturaCliError::Gesture(GestureError::HelperStartError(_)) => (
                "HELPER_START_ERROR",
                Some("Create the helper venv or set GESTURA_HELPER_PYTHON / GESTURA_HELPER_SCRIPT"),
            ),
            GesturaCliError::Gesture(GestureError::HelperReported(_)) => (
                "HELPER_ERROR",
                Some("Check that a webcam is connected and not in use"),
            ),
            GesturaCliError::Gesture(GestureError::IoError(_)) => {
                ("IO_ERROR", Some("Check file paths and permissions"))
            }
            GesturaCliError::Gesture(_) => ("RUNTIME_ERROR", None),
        };

        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}
