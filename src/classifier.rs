//! Rule-based gesture classification
//!
//! Gesture definitions are matched against a [`HandState`] in the order they
//! were declared. The first definition whose conditions all hold wins, so
//! overlapping definitions resolve the same way on every run.

use crate::error::GestureError;
use crate::types::{
    Direction, Finger, FingerRequirements, FingerState, HandState, Handedness, Orientation,
};
use serde::{Deserialize, Serialize};

/// Conditions a hand state must meet for a gesture to match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<Handedness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Required finger states. Fingers not listed must be curled.
    #[serde(default, skip_serializing_if = "FingerRequirements::is_empty")]
    pub fingers: FingerRequirements,
}

impl GestureConditions {
    /// Check whether a hand state satisfies every condition
    pub fn matches(&self, state: &HandState) -> bool {
        if self.handedness.is_some_and(|h| h != state.handedness) {
            return false;
        }
        if self.orientation.is_some_and(|o| o != state.orientation) {
            return false;
        }
        if self.direction.is_some_and(|d| d != state.direction) {
            return false;
        }

        Finger::ALL.iter().all(|finger| {
            let required = self
                .fingers
                .get(finger)
                .copied()
                .unwrap_or(FingerState::Curled);
            state.fingers.get(*finger) == required
        })
    }
}

/// A named gesture rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub name: String,
    pub conditions: GestureConditions,
}

/// Body of one entry in the gesture configuration file
#[derive(Debug, Deserialize)]
struct DefinitionBody {
    #[serde(default)]
    conditions: GestureConditions,
}

/// Ordered set of gesture definitions
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    definitions: Vec<GestureDefinition>,
}

impl GestureClassifier {
    pub fn new(definitions: Vec<GestureDefinition>) -> Self {
        Self { definitions }
    }

    /// Parse a gesture configuration object (`name -> {conditions}`),
    /// keeping the declaration order of its keys.
    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut definitions = Vec::with_capacity(object.len());
        for (name, value) in object {
            let body: DefinitionBody =
                serde_json::from_value(value).map_err(|e| GestureError::ConfigError {
                    path: format!("gesture '{}'", name),
                    reason: e.to_string(),
                })?;
            definitions.push(GestureDefinition {
                name,
                conditions: body.conditions,
            });
        }

        Ok(Self::new(definitions))
    }

    pub fn definitions(&self) -> &[GestureDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Name of the first definition matching the state, if any
    pub fn classify(&self, state: &HandState) -> Option<&str> {
        self.definitions
            .iter()
            .find(|def| def.conditions.matches(state))
            .map(|def| def.name.as_str())
    }
}
