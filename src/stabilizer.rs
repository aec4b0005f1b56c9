//! Frame-to-frame gesture debouncing
//!
//! A raw gesture must be seen on `confirmation_threshold` consecutive frames
//! before it becomes stable. A single frame without a gesture releases the
//! stable gesture immediately.

/// Default number of consecutive frames needed to confirm a gesture
pub const DEFAULT_CONFIRMATION_THRESHOLD: u32 = 2;

/// Confirmation state machine for one tracked hand slot
#[derive(Debug, Clone)]
pub struct GestureStabilizer {
    candidate: Option<String>,
    stable: Option<String>,
    confirmations: u32,
    threshold: u32,
}

impl Default for GestureStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_THRESHOLD)
    }
}

impl GestureStabilizer {
    pub fn new(threshold: u32) -> Self {
        Self {
            candidate: None,
            stable: None,
            confirmations: 0,
            threshold: threshold.max(1),
        }
    }

    /// Feed one frame's raw gesture and return the stable gesture after it
    pub fn update(&mut self, raw: Option<&str>) -> Option<&str> {
        match raw {
            Some(name) if self.candidate.as_deref() == Some(name) => {
                self.confirmations = self.confirmations.saturating_add(1);
            }
            _ => {
                self.candidate = raw.map(str::to_string);
                self.confirmations = 1;
            }
        }

        if raw.is_none() {
            self.stable = None;
        } else if self.confirmations >= self.threshold && self.candidate != self.stable {
            self.stable = self.candidate.clone();
        }

        self.stable.as_deref()
    }

    pub fn stable(&self) -> Option<&str> {
        self.stable.as_deref()
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }
}
