//! Hand state extraction
//!
//! This module turns the 21 raw landmarks of one hand into a semantic state:
//! - Palm orientation from the index/pinky knuckle order
//! - Pointing direction from the wrist to middle-finger base vector
//! - Per-finger curl from tip/joint distances to the wrist

use crate::types::{
    Direction, Finger, FingerState, FingerStates, HandObservation, HandState, Handedness,
    Landmark, Orientation,
};

/// Hand landmark indices (MediaPipe hand landmark model)
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// Default thumb reach, as a multiple of palm width, above which the thumb
/// counts as extended
pub const DEFAULT_THUMB_EXTENSION_RATIO: f64 = 1.3;

/// (tip, pip) landmark pairs for the four long fingers
const LONG_FINGERS: [(Finger, usize, usize); 4] = [
    (
        Finger::Index,
        landmarks::INDEX_FINGER_TIP,
        landmarks::INDEX_FINGER_PIP,
    ),
    (
        Finger::Middle,
        landmarks::MIDDLE_FINGER_TIP,
        landmarks::MIDDLE_FINGER_PIP,
    ),
    (
        Finger::Ring,
        landmarks::RING_FINGER_TIP,
        landmarks::RING_FINGER_PIP,
    ),
    (Finger::Pinky, landmarks::PINKY_TIP, landmarks::PINKY_PIP),
];

/// Extractor for converting landmarks to a semantic hand state
#[derive(Debug, Clone, Copy)]
pub struct HandStateExtractor {
    thumb_extension_ratio: f64,
}

impl Default for HandStateExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_THUMB_EXTENSION_RATIO)
    }
}

impl HandStateExtractor {
    pub fn new(thumb_extension_ratio: f64) -> Self {
        Self {
            thumb_extension_ratio,
        }
    }

    /// Extract the semantic state of one hand.
    ///
    /// Returns `None` when the observation has fewer than 21 landmarks.
    pub fn extract(&self, hand: &HandObservation) -> Option<HandState> {
        if !hand.is_usable() {
            return None;
        }

        let lms = &hand.landmarks;
        let handedness = hand.handedness();

        let mut fingers = FingerStates::all_curled();
        for (finger, tip, pip) in LONG_FINGERS {
            fingers.set(finger, long_finger_state(lms, tip, pip));
        }
        fingers.set(Finger::Thumb, self.thumb_state(lms));

        Some(HandState {
            handedness,
            orientation: orientation(lms, handedness),
            direction: direction(lms),
            fingers,
        })
    }

    /// The thumb extends sideways, so it is measured against palm width
    /// rather than against the wrist.
    fn thumb_state(&self, lms: &[Landmark]) -> FingerState {
        let pinky_base = &lms[landmarks::PINKY_MCP];
        let palm_width = lms[landmarks::INDEX_FINGER_MCP].distance_2d(pinky_base);
        let thumb_distance = lms[landmarks::THUMB_TIP].distance_2d(pinky_base);

        if thumb_distance > palm_width * self.thumb_extension_ratio {
            FingerState::Extended
        } else {
            FingerState::Curled
        }
    }
}

/// Palm orientation for a mirrored (selfie) camera view
fn orientation(lms: &[Landmark], handedness: Handedness) -> Orientation {
    let index_x = lms[landmarks::INDEX_FINGER_MCP].x;
    let pinky_x = lms[landmarks::PINKY_MCP].x;

    let palm_facing = match handedness {
        Handedness::Right => index_x > pinky_x,
        Handedness::Left => index_x < pinky_x,
    };

    if palm_facing {
        Orientation::Front
    } else {
        Orientation::Back
    }
}

fn direction(lms: &[Landmark]) -> Direction {
    let wrist = &lms[landmarks::WRIST];
    let middle_base = &lms[landmarks::MIDDLE_FINGER_MCP];
    let dx = middle_base.x - wrist.x;
    let dy = middle_base.y - wrist.y;

    // Image y grows downwards
    let angle = (-dy).atan2(dx).to_degrees();
    // Snap float noise so exact diagonals land on their boundary
    direction_from_angle((angle * 1e9).round() / 1e9)
}

/// Discretize an angle in degrees.
///
/// Up includes 45 and excludes 135. Down includes both -135 and -45.
pub fn direction_from_angle(angle: f64) -> Direction {
    if (-135.0..=-45.0).contains(&angle) {
        Direction::Down
    } else if (-45.0..45.0).contains(&angle) {
        Direction::Right
    } else if (45.0..135.0).contains(&angle) {
        Direction::Up
    } else {
        Direction::Left
    }
}

fn long_finger_state(lms: &[Landmark], tip: usize, pip: usize) -> FingerState {
    let wrist = &lms[landmarks::WRIST];
    if lms[tip].distance_2d(wrist) > lms[pip].distance_2d(wrist) {
        FingerState::Extended
    } else {
        FingerState::Curled
    }
}
