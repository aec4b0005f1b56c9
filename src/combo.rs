//! Combo sequence assembly
//!
//! Consecutive stable-gesture events from the primary hand build up a combo
//! key such as `fist-open`. A gap longer than the combo timeout starts a
//! fresh sequence.

use std::time::{Duration, Instant};
use tracing::debug;

/// Default maximum gap between gestures of one combo
pub const DEFAULT_COMBO_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default separator between gesture names in a combo key
pub const DEFAULT_COMBO_SEPARATOR: &str = "-";

#[derive(Debug, Clone)]
pub struct ComboTracker {
    sequence: Vec<String>,
    last_event: Option<Instant>,
    timeout: Duration,
    separator: String,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COMBO_TIMEOUT, DEFAULT_COMBO_SEPARATOR)
    }
}

impl ComboTracker {
    pub fn new(timeout: Duration, separator: impl Into<String>) -> Self {
        Self {
            sequence: Vec::new(),
            last_event: None,
            timeout,
            separator: separator.into(),
        }
    }

    /// Record a stable-gesture event at `now` and return the combo key so far
    pub fn update(&mut self, gesture: &str, now: Instant) -> String {
        if let Some(last) = self.last_event {
            if !self.sequence.is_empty() && now.saturating_duration_since(last) > self.timeout {
                debug!(expired = %self.key(), "combo timed out");
                self.sequence.clear();
            }
        }

        self.sequence.push(gesture.to_string());
        self.last_event = Some(now);
        self.key()
    }

    /// Clear the sequence after a combo action fired
    pub fn reset(&mut self) {
        self.sequence.clear();
        self.last_event = None;
        debug!("combo sequence reset");
    }

    /// Current combo key
    pub fn key(&self) -> String {
        self.sequence.join(&self.separator)
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secs(base: Instant, s: f64) -> Instant {
        base + Duration::from_secs_f64(s)
    }

    #[test]
    fn test_combo_within_timeout() {
        let t0 = Instant::now();
        let mut combo = ComboTracker::default();

        assert_eq!(combo.update("fist", t0), "fist");
        assert_eq!(combo.update("open", secs(t0, 1.0)), "fist-open");
    }

    #[test]
    fn test_combo_expires_after_timeout() {
        let t0 = Instant::now();
        let mut combo = ComboTracker::default();

        combo.update("fist", t0);
        assert_eq!(combo.update("open", secs(t0, 2.0)), "open");
        assert_eq!(combo.len(), 1);
    }

    #[test]
    fn test_timeout_measured_from_last_event() {
        let t0 = Instant::now();
        let mut combo = ComboTracker::default();

        combo.update("a", t0);
        combo.update("b", secs(t0, 1.2));
        assert_eq!(combo.update("c", secs(t0, 2.4)), "a-b-c");
    }

    #[test]
    fn test_reset() {
        let t0 = Instant::now();
        let mut combo = ComboTracker::default();

        combo.update("fist", t0);
        combo.update("open", secs(t0, 0.5));
        combo.reset();

        assert!(combo.is_empty());
        assert_eq!(combo.update("fist", secs(t0, 0.6)), "fist");
    }

    #[test]
    fn test_custom_separator() {
        let t0 = Instant::now();
        let mut combo = ComboTracker::new(Duration::from_secs(1), "+");

        combo.update("one", t0);
        assert_eq!(combo.update("two", t0), "one+two");
        assert_eq!(combo.sequence(), &["one".to_string(), "two".to_string()]);
    }
}
