//! Frame observers
//!
//! The session hands every processed frame to a [`FrameObserver`]. In debug
//! mode that is the [`DebugOverlay`], which reports each tracked hand's state
//! and gestures. Headless runs use [`NullObserver`] or a caller-supplied
//! observer.

use crate::types::HandReport;
use tracing::{debug, info};

pub trait FrameObserver {
    /// Called once per processed frame with the tracked hands in slot order
    fn observe(&mut self, hands: &[HandReport], has_image: bool);

    /// Release any resources. Must be safe to call more than once.
    fn close(&mut self) {}
}

/// Observer that ignores every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl FrameObserver for NullObserver {
    fn observe(&mut self, _hands: &[HandReport], _has_image: bool) {}
}

/// Debug view of the per-hand pipeline state
///
/// Logs a line per hand whenever what it would display changes, so a held
/// gesture does not flood the log.
#[derive(Debug, Default)]
pub struct DebugOverlay {
    last_lines: Vec<String>,
    frames: u64,
    frames_with_image: u64,
    closed: bool,
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text shown for one hand
    pub fn render(report: &HandReport) -> String {
        let state = report
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no state".to_string());
        format!(
            "Hand {} ({}) | Raw: {} -> Stable: {} | {}",
            report.slot,
            report.handedness.as_str(),
            report.raw_gesture.as_deref().unwrap_or("None"),
            report.stable_gesture.as_deref().unwrap_or("None"),
            state
        )
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn frames_with_image(&self) -> u64 {
        self.frames_with_image
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameObserver for DebugOverlay {
    fn observe(&mut self, hands: &[HandReport], has_image: bool) {
        if self.closed {
            return;
        }

        self.frames += 1;
        if has_image {
            self.frames_with_image += 1;
        }

        let lines: Vec<String> = hands.iter().map(Self::render).collect();
        if lines != self.last_lines {
            if lines.is_empty() {
                info!("No hands detected");
            }
            for line in &lines {
                info!("{}", line);
            }
            self.last_lines = lines;
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(
            frames = self.frames,
            frames_with_image = self.frames_with_image,
            "debug overlay closed"
        );
    }
}
