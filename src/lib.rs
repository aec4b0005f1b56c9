//! Gestura - hand gesture recognition and action engine
//!
//! Gestura turns a stream of hand landmarks from a vision helper into stable
//! gestures and runs the commands bound to them through a deterministic
//! pipeline: landmark extraction → rule classification → stabilization →
//! combo tracking → action dispatch.
//!
//! ## Modules
//!
//! - **Recognition**: [`extractor`], [`classifier`], [`stabilizer`]
//! - **Actions**: [`combo`], [`dispatcher`], [`notifier`]
//! - **Runtime**: [`engine`], [`session`], [`helper`], [`overlay`], [`config`]

pub mod classifier;
pub mod combo;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod helper;
pub mod notifier;
pub mod overlay;
pub mod session;
pub mod stabilizer;
pub mod types;

pub use classifier::{GestureClassifier, GestureConditions, GestureDefinition};
pub use combo::ComboTracker;
pub use config::{AppConfig, EngineSettings, HelperConfig};
pub use dispatcher::{ActionBindings, ActionDispatcher, CommandLauncher, DispatchOutcome, ShellLauncher};
pub use engine::{FrameOutcome, GestureEngine, GestureEvent};
pub use error::GestureError;
pub use extractor::HandStateExtractor;
pub use helper::{ShutdownHandle, VisionHelper};
pub use notifier::{DesktopNotifier, LogNotifier, Notifier};
pub use overlay::{DebugOverlay, FrameObserver, NullObserver};
pub use session::{RunSummary, Session, StopReason};
pub use stabilizer::GestureStabilizer;

/// Gestura version reported by the CLI
pub const GESTURA_VERSION: &str = env!("CARGO_PKG_VERSION");
