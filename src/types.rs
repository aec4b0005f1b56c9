//! Core types for the Gestura pipeline
//!
//! This module defines the data that flows through each stage: landmark frames
//! from the vision helper, the semantic hand state derived from them, and the
//! per-hand report handed to observers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of landmarks in a complete hand observation
pub const LANDMARK_COUNT: usize = 21;

/// A single normalized landmark in camera-relative coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// X coordinate (0.0 to 1.0, normalized to image width)
    pub x: f64,
    /// Y coordinate (0.0 to 1.0, normalized to image height)
    pub y: f64,
    /// Depth relative to the wrist; unused by the classifier
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance in the (x, y) plane
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Which hand an observation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }

    /// Parse a helper label ("Left", "right", ...). Anything that is not
    /// "right" is treated as a left hand.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("right") {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}

/// Whether the palm faces the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Front,
    Back,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Front => "front",
            Orientation::Back => "back",
        }
    }
}

/// Direction the hand points, from wrist towards the middle-finger base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerState {
    Extended,
    Curled,
}

impl FingerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerState::Extended => "extended",
            FingerState::Curled => "curled",
        }
    }
}

/// Per-finger curl for one hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerStates {
    pub thumb: FingerState,
    pub index: FingerState,
    pub middle: FingerState,
    pub ring: FingerState,
    pub pinky: FingerState,
}

impl FingerStates {
    /// A closed fist: every finger curled
    pub fn all_curled() -> Self {
        Self {
            thumb: FingerState::Curled,
            index: FingerState::Curled,
            middle: FingerState::Curled,
            ring: FingerState::Curled,
            pinky: FingerState::Curled,
        }
    }

    pub fn get(&self, finger: Finger) -> FingerState {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    pub fn set(&mut self, finger: Finger, state: FingerState) {
        match finger {
            Finger::Thumb => self.thumb = state,
            Finger::Index => self.index = state,
            Finger::Middle => self.middle = state,
            Finger::Ring => self.ring = state,
            Finger::Pinky => self.pinky = state,
        }
    }

    pub fn extended_count(&self) -> usize {
        Finger::ALL
            .iter()
            .filter(|f| self.get(**f) == FingerState::Extended)
            .count()
    }
}

/// Semantic snapshot of one hand in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandState {
    pub handedness: Handedness,
    pub orientation: Orientation,
    pub direction: Direction,
    pub fingers: FingerStates,
}

impl fmt::Display for HandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [",
            self.handedness.as_str(),
            self.orientation.as_str(),
            self.direction.as_str()
        )?;
        for (i, finger) in Finger::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}:{}", finger.as_str(), self.fingers.get(*finger).as_str())?;
        }
        write!(f, "]")
    }
}

/// One hand as reported by the vision helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    /// Raw label from the helper ("Left" or "Right")
    pub handedness: String,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl HandObservation {
    pub fn handedness(&self) -> Handedness {
        Handedness::from_label(&self.handedness)
    }

    /// Whether the observation carries enough landmarks to classify
    pub fn is_usable(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }
}

/// One line of the vision helper's output stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
    /// Base64 encoded camera frame, only sent in debug mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameMessage {
    /// Parse one line of helper output
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Parse one raw line of helper output. Invalid UTF-8 is a parse error.
    pub fn from_slice(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// The helper-reported error, if non-empty
    pub fn reported_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.frame.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// Everything known about one tracked hand after a frame, for observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandReport {
    pub slot: usize,
    pub handedness: Handedness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<HandState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_gesture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_gesture: Option<String>,
}

/// Partial finger requirements used by gesture conditions
pub type FingerRequirements = BTreeMap<Finger, FingerState>;
