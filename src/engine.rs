//! Per-frame pipeline orchestration
//!
//! [`GestureEngine`] owns every piece of state that lives across frames and
//! runs one frame through the full pipeline:
//!
//! 1. HandStateExtractor - landmarks to semantic hand state
//! 2. GestureClassifier - hand state to raw gesture name
//! 3. GestureStabilizer - raw gesture to stable gesture (one per hand slot)
//! 4. ComboTracker - primary-hand stable gestures to a combo key
//! 5. ActionDispatcher - combo key or gesture to a launched command

use crate::classifier::GestureClassifier;
use crate::combo::ComboTracker;
use crate::config::{AppConfig, EngineSettings};
use crate::dispatcher::{ActionBindings, ActionDispatcher, CommandLauncher, DispatchOutcome};
use crate::extractor::HandStateExtractor;
use crate::stabilizer::GestureStabilizer;
use crate::types::{FrameMessage, HandObservation, HandReport, HandState};
use std::time::Instant;
use tracing::trace;

/// Number of hand slots tracked at once
pub const MAX_HANDS: usize = 2;

/// A change of the primary hand's stable gesture and what it triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEvent {
    pub gesture: String,
    pub outcome: DispatchOutcome,
}

/// Result of processing one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// One report per tracked hand present in the frame
    pub hands: Vec<HandReport>,
    /// Set when the primary hand's stable gesture changed to a new gesture
    pub event: Option<GestureEvent>,
}

impl FrameOutcome {
    pub fn primary(&self) -> Option<&HandReport> {
        self.hands.first()
    }
}

pub struct GestureEngine {
    extractor: HandStateExtractor,
    classifier: GestureClassifier,
    stabilizers: [GestureStabilizer; MAX_HANDS],
    combo: ComboTracker,
    dispatcher: ActionDispatcher,
    /// Last stable gesture of the primary hand that produced an event
    last_stable: Option<String>,
}

impl GestureEngine {
    /// Build an engine from loaded configuration
    pub fn new(config: AppConfig, launcher: Box<dyn CommandLauncher>) -> Self {
        Self::with_parts(config.gestures, config.actions, &config.settings, launcher)
    }

    pub fn with_parts(
        classifier: GestureClassifier,
        bindings: ActionBindings,
        settings: &EngineSettings,
        launcher: Box<dyn CommandLauncher>,
    ) -> Self {
        Self {
            extractor: HandStateExtractor::new(settings.thumb_extension_ratio),
            classifier,
            stabilizers: [
                GestureStabilizer::new(settings.confirmation_threshold),
                GestureStabilizer::new(settings.confirmation_threshold),
            ],
            combo: ComboTracker::new(settings.combo_timeout(), settings.combo_separator.clone()),
            dispatcher: ActionDispatcher::new(bindings, settings.action_cooldown(), launcher),
            last_stable: None,
        }
    }

    /// Classify a single hand without touching any stabilizer.
    ///
    /// Hands with fewer than 21 landmarks yield no state and no gesture.
    pub fn recognize(&self, hand: &HandObservation) -> (Option<String>, Option<HandState>) {
        let state = self.extractor.extract(hand);
        let raw = state
            .as_ref()
            .and_then(|s| self.classifier.classify(s))
            .map(str::to_string);
        (raw, state)
    }

    /// Run one frame through the pipeline
    pub fn process_frame(&mut self, frame: &FrameMessage, now: Instant) -> FrameOutcome {
        let mut hands = Vec::with_capacity(MAX_HANDS);

        for (slot, stabilizer) in self.stabilizers.iter_mut().enumerate() {
            let Some(hand) = frame.hands.get(slot) else {
                // Hand lost: release this slot at once
                stabilizer.update(None);
                continue;
            };

            let state = self.extractor.extract(hand);
            let raw = state.as_ref().and_then(|s| self.classifier.classify(s));
            let stable = stabilizer.update(raw);

            trace!(
                slot,
                handedness = %hand.handedness,
                raw = raw.unwrap_or("None"),
                stable = stable.unwrap_or("None"),
                "hand classified"
            );

            hands.push(HandReport {
                slot,
                handedness: hand.handedness(),
                state,
                raw_gesture: raw.map(str::to_string),
                stable_gesture: stable.map(str::to_string),
            });
        }

        let primary_stable = self.stabilizers[0].stable().map(str::to_string);
        let event = match primary_stable {
            Some(gesture) if self.last_stable.as_deref() != Some(gesture.as_str()) => {
                self.last_stable = Some(gesture.clone());
                let outcome = self.dispatcher.dispatch(&gesture, &mut self.combo, now);
                Some(GestureEvent { gesture, outcome })
            }
            Some(_) => None,
            None => {
                self.last_stable = None;
                None
            }
        };

        FrameOutcome { hands, event }
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn stabilizer(&self, slot: usize) -> Option<&GestureStabilizer> {
        self.stabilizers.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::testing::RecordingLauncher;
    use crate::extractor::fixtures;
    use crate::types::Handedness;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn gestures() -> GestureClassifier {
        GestureClassifier::from_json(
            r#"{
                "point": { "conditions": { "fingers": { "index": "extended" } } },
                "open": { "conditions": { "fingers": {
                    "thumb": "extended", "index": "extended", "middle": "extended",
                    "ring": "extended", "pinky": "extended" } } },
                "fist": { "conditions": {} }
            }"#,
        )
        .unwrap()
    }

    fn engine(actions: &[(&str, &str)]) -> (GestureEngine, RecordingLauncher) {
        let launcher = RecordingLauncher::default();
        let bindings = actions
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let engine = GestureEngine::with_parts(
            gestures(),
            bindings,
            &EngineSettings::default(),
            Box::new(launcher.clone()),
        );
        (engine, launcher)
    }

    fn frame(hands: Vec<HandObservation>) -> FrameMessage {
        FrameMessage {
            hands,
            ..Default::default()
        }
    }

    fn at(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_recognize() {
        let (engine, _) = engine(&[]);

        let (raw, state) = engine.recognize(&fixtures::pointing_index());
        assert_eq!(raw.as_deref(), Some("point"));
        assert_eq!(state.unwrap().handedness, Handedness::Right);

        assert_eq!(engine.recognize(&fixtures::fist()).0.as_deref(), Some("fist"));
        assert_eq!(engine.recognize(&fixtures::open_palm()).0.as_deref(), Some("open"));
    }

    #[test]
    fn test_short_landmark_set_never_classifies() {
        let (mut engine, _) = engine(&[]);
        let t0 = Instant::now();

        let mut hand = fixtures::fist();
        hand.landmarks.truncate(20);

        for i in 0..3 {
            let outcome = engine.process_frame(&frame(vec![hand.clone()]), at(t0, i * 33));
            let report = outcome.primary().unwrap();
            assert_eq!(report.raw_gesture, None);
            assert_eq!(report.state, None);
            assert_eq!(outcome.event, None);
        }
    }

    #[test]
    fn test_event_on_confirmation_only() {
        let (mut engine, launcher) = engine(&[("fist", "echo fist")]);
        let t0 = Instant::now();

        let first = engine.process_frame(&frame(vec![fixtures::fist()]), t0);
        assert_eq!(first.event, None);

        let second = engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 33));
        assert_eq!(
            second.event,
            Some(GestureEvent {
                gesture: "fist".to_string(),
                outcome: DispatchOutcome::ComboFired {
                    key: "fist".to_string()
                },
            })
        );

        // Holding the gesture does not re-trigger
        let third = engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 66));
        assert_eq!(third.event, None);
        assert_eq!(launcher.triggers(), vec!["fist"]);
    }

    #[test]
    fn test_combo_through_pipeline() {
        let (mut engine, launcher) = engine(&[("fist-open", "echo combo")]);
        let t0 = Instant::now();

        engine.process_frame(&frame(vec![fixtures::fist()]), t0);
        engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 33));
        engine.process_frame(&frame(vec![fixtures::open_palm()]), at(t0, 400));
        let outcome = engine.process_frame(&frame(vec![fixtures::open_palm()]), at(t0, 433));

        assert_eq!(
            outcome.event.map(|e| e.outcome),
            Some(DispatchOutcome::ComboFired {
                key: "fist-open".to_string()
            })
        );
        assert!(engine.combo().is_empty());
        assert_eq!(launcher.triggers(), vec!["fist-open"]);
    }

    #[test]
    fn test_hand_loss_releases_and_rearms() {
        let (mut engine, launcher) = engine(&[("fist", "echo fist")]);
        let t0 = Instant::now();

        engine.process_frame(&frame(vec![fixtures::fist()]), t0);
        engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 33));

        let empty = engine.process_frame(&frame(vec![]), at(t0, 66));
        assert!(empty.hands.is_empty());
        assert_eq!(engine.stabilizer(0).unwrap().stable(), None);

        // Shown again after release: a fresh sequence fires again
        engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 1200));
        let outcome = engine.process_frame(&frame(vec![fixtures::fist()]), at(t0, 1233));

        assert!(outcome.event.unwrap().outcome.fired());
        assert_eq!(launcher.triggers(), vec!["fist", "fist"]);
    }

    #[test]
    fn test_secondary_hand_never_dispatches() {
        let (mut engine, launcher) = engine(&[("point", "echo point")]);
        let t0 = Instant::now();

        let mut left = fixtures::pointing_index();
        left.handedness = "Left".to_string();
        let two_hands = frame(vec![fixtures::fist(), left]);

        engine.process_frame(&two_hands, t0);
        let outcome = engine.process_frame(&two_hands, at(t0, 33));

        assert_eq!(outcome.hands.len(), 2);
        assert_eq!(outcome.hands[1].stable_gesture.as_deref(), Some("point"));
        assert_eq!(outcome.event.map(|e| e.gesture), Some("fist".to_string()));
        assert!(launcher.triggers().is_empty());
    }

    #[test]
    fn test_extra_hands_ignored() {
        let (mut engine, _) = engine(&[]);
        let hands = vec![fixtures::fist(), fixtures::fist(), fixtures::fist()];

        let outcome = engine.process_frame(&frame(hands), Instant::now());
        assert_eq!(outcome.hands.len(), MAX_HANDS);
    }
}
