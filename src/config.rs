//! Configuration loading
//!
//! Gestures, action bindings and engine tuning live in JSON files in one
//! directory:
//! - `gestures.json`: `name -> {conditions}` in evaluation order
//! - `actions.json`: `key -> command template`
//! - `settings.json` (optional): [`EngineSettings`] overrides
//!
//! A missing file is not an error; it yields an empty set (or defaults) and
//! a warning.

use crate::classifier::GestureClassifier;
use crate::combo::{DEFAULT_COMBO_SEPARATOR, DEFAULT_COMBO_TIMEOUT};
use crate::dispatcher::{ActionBindings, DEFAULT_ACTION_COOLDOWN};
use crate::error::GestureError;
use crate::extractor::DEFAULT_THUMB_EXTENSION_RATIO;
use crate::stabilizer::DEFAULT_CONFIRMATION_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const GESTURES_FILE: &str = "gestures.json";
pub const ACTIONS_FILE: &str = "actions.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "GESTURA_CONFIG_DIR";
pub const HELPER_PYTHON_ENV: &str = "GESTURA_HELPER_PYTHON";
pub const HELPER_SCRIPT_ENV: &str = "GESTURA_HELPER_SCRIPT";

/// Tuning knobs for the gesture engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Consecutive frames needed before a gesture becomes stable
    pub confirmation_threshold: u32,
    /// Maximum gap between gestures of one combo (ms)
    pub combo_timeout_ms: u64,
    /// Minimum interval between repeated firings of one gesture (ms)
    pub action_cooldown_ms: u64,
    /// Thumb reach, in palm widths, above which the thumb counts as extended
    pub thumb_extension_ratio: f64,
    pub combo_separator: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            confirmation_threshold: DEFAULT_CONFIRMATION_THRESHOLD,
            combo_timeout_ms: DEFAULT_COMBO_TIMEOUT.as_millis() as u64,
            action_cooldown_ms: DEFAULT_ACTION_COOLDOWN.as_millis() as u64,
            thumb_extension_ratio: DEFAULT_THUMB_EXTENSION_RATIO,
            combo_separator: DEFAULT_COMBO_SEPARATOR.to_string(),
        }
    }
}

impl EngineSettings {
    pub fn combo_timeout(&self) -> Duration {
        Duration::from_millis(self.combo_timeout_ms)
    }

    pub fn action_cooldown(&self) -> Duration {
        Duration::from_millis(self.action_cooldown_ms)
    }
}

/// How to start the vision helper process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    pub python: PathBuf,
    pub script: PathBuf,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("mediapipe_helper/venv/bin/python"),
            script: PathBuf::from("mediapipe_helper/mediapipe_helper.py"),
        }
    }
}

impl HelperConfig {
    /// Defaults, overridden by `GESTURA_HELPER_PYTHON` / `GESTURA_HELPER_SCRIPT`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            python: std::env::var_os(HELPER_PYTHON_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.python),
            script: std::env::var_os(HELPER_SCRIPT_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.script),
        }
    }
}

/// Everything loaded at startup
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub gestures: GestureClassifier,
    pub actions: ActionBindings,
    pub settings: EngineSettings,
}

impl AppConfig {
    /// Load all configuration files from `dir`
    pub fn load(dir: &Path) -> Result<Self, GestureError> {
        let gestures = load_gestures(&dir.join(GESTURES_FILE))?;
        info!("Loaded {} gesture definitions.", gestures.len());

        let actions = load_actions(&dir.join(ACTIONS_FILE))?;
        info!("Loaded {} action mappings.", actions.len());

        let settings = load_settings(&dir.join(SETTINGS_FILE))?;

        Ok(Self {
            gestures,
            actions,
            settings,
        })
    }

    /// Directory named by `GESTURA_CONFIG_DIR`, or the working directory
    pub fn default_dir() -> PathBuf {
        std::env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn load_gestures(path: &Path) -> Result<GestureClassifier, GestureError> {
    match read_optional(path)? {
        Some(json) => GestureClassifier::from_json(&json).map_err(|e| config_error(path, e)),
        None => Ok(GestureClassifier::default()),
    }
}

pub fn load_actions(path: &Path) -> Result<ActionBindings, GestureError> {
    match read_optional(path)? {
        Some(json) => ActionBindings::from_json(&json).map_err(|e| config_error(path, e)),
        None => Ok(ActionBindings::default()),
    }
}

pub fn load_settings(path: &Path) -> Result<EngineSettings, GestureError> {
    if !path.exists() {
        return Ok(EngineSettings::default());
    }
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| config_error(path, e.into()))
}

/// Read a file, treating a missing file as absent
fn read_optional(path: &Path) -> Result<Option<String>, GestureError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(
                "Warning: Config file not found at '{}'. Using an empty set.",
                path.display()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn config_error(path: &Path, err: GestureError) -> GestureError {
    match err {
        GestureError::ConfigError { path: inner, reason } => GestureError::ConfigError {
            path: path.display().to_string(),
            reason: format!("{}: {}", inner, reason),
        },
        other => GestureError::ConfigError {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Fresh empty directory under the system temp dir, removed on drop
    struct ScratchDir(PathBuf);

    impl std::ops::Deref for ScratchDir {
        type Target = Path;

        fn deref(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn scratch_dir(name: &str) -> ScratchDir {
        let dir = std::env::temp_dir().join(format!("gestura-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        ScratchDir(dir)
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let dir = scratch_dir("drop");
        let path = dir.to_path_buf();
        fs::write(dir.join(ACTIONS_FILE), "{}").unwrap();

        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_files_give_empty_config() {
        let dir = scratch_dir("missing");
        let config = AppConfig::load(&dir).unwrap();

        assert!(config.gestures.is_empty());
        assert!(config.actions.is_empty());
        assert_eq!(config.settings, EngineSettings::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = scratch_dir("load");
        fs::write(
            dir.join(GESTURES_FILE),
            r#"{"fist": {"conditions": {}}, "point": {"conditions": {"fingers": {"index": "extended"}}}}"#,
        )
        .unwrap();
        fs::write(dir.join(ACTIONS_FILE), r#"{"fist": "echo fist"}"#).unwrap();
        fs::write(dir.join(SETTINGS_FILE), r#"{"confirmation_threshold": 3}"#).unwrap();

        let config = AppConfig::load(&dir).unwrap();

        assert_eq!(config.gestures.len(), 2);
        assert_eq!(config.gestures.definitions()[0].name, "fist");
        assert_eq!(config.actions.get("fist"), Some("echo fist"));
        assert_eq!(config.settings.confirmation_threshold, 3);
        assert_eq!(config.settings.combo_timeout(), Duration::from_millis(1500));
        assert_eq!(config.settings.action_cooldown(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = scratch_dir("invalid");
        fs::write(dir.join(ACTIONS_FILE), "{not json").unwrap();

        let result = load_actions(&dir.join(ACTIONS_FILE));
        match result {
            Err(GestureError::ConfigError { path, .. }) => assert!(path.ends_with(ACTIONS_FILE)),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();

        assert_eq!(settings.confirmation_threshold, 2);
        assert_eq!(settings.combo_timeout_ms, 1500);
        assert_eq!(settings.action_cooldown_ms, 1000);
        assert_eq!(settings.thumb_extension_ratio, 1.3);
        assert_eq!(settings.combo_separator, "-");
    }
}
