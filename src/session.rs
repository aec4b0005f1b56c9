//! Frame loop
//!
//! A [`Session`] reads newline-delimited frame messages, feeds each one
//! through the [`GestureEngine`] and hands the result to a
//! [`FrameObserver`]. Malformed lines are logged and skipped; an error
//! reported by the helper ends the run.

use crate::engine::GestureEngine;
use crate::error::GestureError;
use crate::helper::ShutdownHandle;
use crate::overlay::FrameObserver;
use crate::types::FrameMessage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::BufRead;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a session stopped reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The helper closed its output
    EndOfStream,
    /// Shutdown was requested while running
    Interrupted,
    /// The helper reported an error
    HelperError,
    /// Reading the helper output failed
    ReadError,
}

/// Statistics for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Frames processed by the engine
    pub frames: u64,
    pub malformed_lines: u64,
    /// Primary-hand stable gesture changes
    pub gesture_events: u64,
    pub actions_fired: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            frames: 0,
            malformed_lines: 0,
            gesture_events: 0,
            actions_fired: 0,
            stop_reason: None,
        }
    }

    fn finish(&mut self, reason: StopReason) {
        self.finished_at = Some(Utc::now());
        self.stop_reason = Some(reason);
    }
}

pub struct Session<O: FrameObserver> {
    engine: GestureEngine,
    observer: O,
    shutdown: Option<ShutdownHandle>,
    summary: RunSummary,
    closed: bool,
}

impl<O: FrameObserver> Session<O> {
    pub fn new(engine: GestureEngine, observer: O) -> Self {
        Self {
            engine,
            observer,
            shutdown: None,
            summary: RunSummary::new(),
            closed: false,
        }
    }

    /// Stop the helper through `handle` when the session closes, and treat
    /// its shutdown as an interrupt.
    pub fn with_shutdown(mut self, handle: ShutdownHandle) -> Self {
        self.shutdown = Some(handle);
        self
    }

    /// Process lines until the stream ends, shutdown is requested or the
    /// helper reports an error.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<RunSummary, GestureError> {
        self.run_with_clock(reader, Instant::now)
    }

    /// Like [`Session::run`], reading the time for each frame from `clock`
    pub fn run_with_clock<R, C>(&mut self, mut reader: R, mut clock: C) -> Result<RunSummary, GestureError>
    where
        R: BufRead,
        C: FnMut() -> Instant,
    {
        self.summary = RunSummary::new();
        info!("Gesture recognition started");

        // Raw bytes: a line that is not UTF-8 is a malformed frame, not a read failure
        let mut line = Vec::new();
        loop {
            if self.interrupted() {
                break;
            }

            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading from vision helper: {}", e);
                    self.summary.finish(StopReason::ReadError);
                    return Err(e.into());
                }
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match self.process_line(&line, &mut clock) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!("{}", e);
                    self.summary.finish(StopReason::HelperError);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Error parsing JSON from helper: {}", e);
                    self.summary.malformed_lines += 1;
                }
            }
        }

        let reason = if self.interrupted() {
            StopReason::Interrupted
        } else {
            StopReason::EndOfStream
        };
        info!(?reason, frames = self.summary.frames, "Gesture recognition stopped");
        self.summary.finish(reason);

        Ok(self.summary.clone())
    }

    /// Parse and process one non-blank line
    fn process_line<C>(&mut self, line: &[u8], clock: &mut C) -> Result<(), GestureError>
    where
        C: FnMut() -> Instant,
    {
        let frame = FrameMessage::from_slice(line)?;

        if let Some(message) = frame.reported_error() {
            return Err(GestureError::HelperReported(message.to_string()));
        }

        let outcome = self.engine.process_frame(&frame, clock());
        self.summary.frames += 1;
        if let Some(event) = &outcome.event {
            self.summary.gesture_events += 1;
            if event.outcome.fired() {
                self.summary.actions_fired += 1;
            }
            debug!(gesture = %event.gesture, outcome = ?event.outcome, "gesture event");
        }

        self.observer.observe(&outcome.hands, frame.has_image());
        Ok(())
    }

    /// Close the observer and stop the helper. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.observer.close();
        if let Some(handle) = &self.shutdown {
            handle.shutdown();
        }
    }

    /// Summary of the current or last run
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    fn interrupted(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownHandle::is_requested)
    }
}

impl<O: FrameObserver> Drop for Session<O> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureClassifier;
    use crate::config::EngineSettings;
    use crate::dispatcher::testing::RecordingLauncher;
    use crate::extractor::fixtures;
    use crate::types::HandReport;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::time::Duration;

    /// Observer that keeps every stable gesture it was shown
    #[derive(Default)]
    struct Recorder {
        stable: Vec<Option<String>>,
        images: usize,
        closes: usize,
    }

    impl FrameObserver for Recorder {
        fn observe(&mut self, hands: &[HandReport], has_image: bool) {
            self.stable
                .push(hands.first().and_then(|h| h.stable_gesture.clone()));
            if has_image {
                self.images += 1;
            }
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn engine(launcher: &RecordingLauncher) -> GestureEngine {
        let gestures = GestureClassifier::from_json(
            r#"{
                "point": { "conditions": { "fingers": { "index": "extended" } } },
                "fist": { "conditions": {} }
            }"#,
        )
        .unwrap();
        let bindings = [("fist".to_string(), "echo fist".to_string())]
            .into_iter()
            .collect();
        GestureEngine::with_parts(
            gestures,
            bindings,
            &EngineSettings::default(),
            Box::new(launcher.clone()),
        )
    }

    fn line(frame: &FrameMessage) -> String {
        serde_json::to_string(frame).unwrap()
    }

    fn hand_line(hand: crate::types::HandObservation) -> String {
        line(&FrameMessage {
            hands: vec![hand],
            ..Default::default()
        })
    }

    /// Clock advancing 33ms per frame
    fn ticking() -> impl FnMut() -> Instant {
        let start = Instant::now();
        let mut frame = 0u32;
        move || {
            frame += 1;
            start + Duration::from_millis(33) * frame
        }
    }

    #[test]
    fn test_run_to_end_of_stream() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::new(engine(&launcher), Recorder::default());

        let input = [
            hand_line(fixtures::fist()),
            String::new(),
            "not json".to_string(),
            hand_line(fixtures::fist()),
            line(&FrameMessage::default()),
        ]
        .join("\n");

        let summary = session
            .run_with_clock(Cursor::new(input), ticking())
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.malformed_lines, 1);
        assert_eq!(summary.gesture_events, 1);
        assert_eq!(summary.actions_fired, 1);
        assert_eq!(summary.stop_reason, Some(StopReason::EndOfStream));
        assert!(summary.finished_at.is_some());
        assert_eq!(launcher.triggers(), vec!["fist"]);
        assert_eq!(
            session.observer().stable,
            vec![None, Some("fist".to_string()), None]
        );
    }

    #[test]
    fn test_helper_error_stops_run() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::new(engine(&launcher), Recorder::default());

        let input = [
            hand_line(fixtures::fist()),
            r#"{"hands":[],"error":"Cannot open webcam"}"#.to_string(),
            hand_line(fixtures::fist()),
        ]
        .join("\n");

        let result = session.run_with_clock(Cursor::new(input), ticking());

        match result {
            Err(GestureError::HelperReported(message)) => assert_eq!(message, "Cannot open webcam"),
            other => panic!("expected helper error, got {:?}", other),
        }
        assert_eq!(session.summary().frames, 1);
        assert_eq!(session.summary().stop_reason, Some(StopReason::HelperError));
        assert!(launcher.triggers().is_empty());
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::new(engine(&launcher), Recorder::default());

        let mut input = b"{\"hands\":[]}\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"{\"hands\":[]}\n");

        let summary = session
            .run_with_clock(Cursor::new(input), ticking())
            .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.malformed_lines, 1);
        assert_eq!(summary.stop_reason, Some(StopReason::EndOfStream));
    }

    #[test]
    fn test_empty_error_field_is_ignored() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::new(engine(&launcher), Recorder::default());

        let input = r#"{"hands":[],"error":"","frame":"aGVsbG8="}"#;
        let summary = session.run(Cursor::new(input)).unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(session.observer().images, 1);
    }

    #[test]
    fn test_interrupted_before_reading() {
        let launcher = RecordingLauncher::default();
        let handle = ShutdownHandle::detached();
        let mut session =
            Session::new(engine(&launcher), Recorder::default()).with_shutdown(handle.clone());

        handle.shutdown();
        let summary = session
            .run(Cursor::new(hand_line(fixtures::fist())))
            .unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(summary.stop_reason, Some(StopReason::Interrupted));
    }

    #[test]
    fn test_close_once() {
        let launcher = RecordingLauncher::default();
        let handle = ShutdownHandle::detached();
        let mut session =
            Session::new(engine(&launcher), Recorder::default()).with_shutdown(handle.clone());

        session.close();
        session.close();

        assert_eq!(session.observer().closes, 1);
        assert!(handle.is_requested());
    }

    #[test]
    fn test_summary_serializes() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::new(engine(&launcher), Recorder::default());
        let summary = session.run(Cursor::new("")).unwrap();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["frames"], 0);
        assert_eq!(json["stop_reason"], "end_of_stream");
    }
}
