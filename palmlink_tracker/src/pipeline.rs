use crate::classifier::{Classifier, ClassifierConfig, GestureState};
use crate::emitter::{Command, CommandEmitter, EmitterConfig};
use crate::landmarks::HandFrame;
use serde::Deserialize;
use std::io::BufRead;
use std::time::Instant;

/// A landmark frame stamped with the source's capture time.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimedFrame {
    pub timestamp_ms: f64,
    #[serde(flatten)]
    pub frame: HandFrame,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame source io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where landmark frames come from. The sensor/model pipeline is an
/// external collaborator; the agent only consumes its output stream.
pub trait FrameSource {
    /// Next frame; `Ok(None)` when the stream ends.
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, FrameError>;
}

/// Reads one JSON frame per line, e.g. from the tracker subprocess's
/// stdout or the agent's own stdin. Blank lines are skipped.
pub struct JsonlFrameSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> JsonlFrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> FrameSource for JsonlFrameSource<R> {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, FrameError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}

/// Everything one processed frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub state: GestureState,
    pub commands: Vec<Command>,
}

/// Classifier → emitter, one frame at a time. At most one frame is ever in
/// flight; a frame whose timestamp matches the last processed one is
/// skipped as an idempotent no-op.
pub struct Pipeline {
    classifier: Classifier,
    emitter: CommandEmitter,
    last_timestamp: Option<f64>,
}

impl Pipeline {
    pub fn new(classifier: ClassifierConfig, emitter: EmitterConfig) -> Self {
        Self {
            classifier: Classifier::new(classifier),
            emitter: CommandEmitter::new(emitter),
            last_timestamp: None,
        }
    }

    pub fn process(&mut self, frame: &TimedFrame, now: Instant) -> Option<FrameOutput> {
        if self.last_timestamp == Some(frame.timestamp_ms) {
            return None;
        }
        self.last_timestamp = Some(frame.timestamp_ms);

        let state = self.classifier.classify(&frame.frame);
        let commands = self.emitter.update(&state, now);
        Some(FrameOutput { state, commands })
    }

    /// Tear down for a camera/device restart: smoothing state clears and
    /// an in-progress drag is closed out with the returned `UP`.
    pub fn reset(&mut self) -> Option<Command> {
        self.last_timestamp = None;
        self.classifier.reset();
        self.emitter.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Point, LANDMARKS_PER_HAND};
    use crate::Hand;
    use palmlink_protocol::{MouseEvent, MouseKind};
    use std::io::Cursor;

    fn pinch_frame(timestamp_ms: f64) -> TimedFrame {
        let mut points = [Point::new(0.5, 0.5, 0.0); LANDMARKS_PER_HAND];
        points[crate::landmarks::THUMB_TIP] = Point::new(0.52, 0.5, 0.0);
        points[crate::landmarks::PINKY_MCP] = Point::new(0.55, 0.52, 0.0);
        TimedFrame {
            timestamp_ms,
            frame: HandFrame {
                hands: vec![Hand(points)],
            },
        }
    }

    #[test]
    fn duplicate_timestamp_is_a_no_op() {
        let mut pipeline = Pipeline::new(ClassifierConfig::default(), EmitterConfig::default());
        let now = Instant::now();

        let first = pipeline.process(&pinch_frame(100.0), now).unwrap();
        // Pinch at index tip (0.5, 0.5) on the default 1920x1080 screen.
        assert!(first.commands.contains(&Command::Mouse(MouseEvent::new(
            MouseKind::Down,
            960.0,
            540.0
        ))));
        assert!(pipeline.process(&pinch_frame(100.0), now).is_none());
        assert!(pipeline.process(&pinch_frame(133.0), now).is_some());
    }

    #[test]
    fn reset_closes_an_open_drag() {
        let mut pipeline = Pipeline::new(ClassifierConfig::default(), EmitterConfig::default());
        let now = Instant::now();
        pipeline.process(&pinch_frame(100.0), now);
        pipeline.process(&pinch_frame(133.0), now);

        let Some(Command::Mouse(up)) = pipeline.reset() else {
            panic!("device switch mid-drag must emit UP");
        };
        assert_eq!(up.kind, MouseKind::Up);
    }

    #[test]
    fn jsonl_source_parses_frames_and_skips_blanks() {
        let point = r#"{"x":0.5,"y":0.5,"z":0.0}"#;
        let hand = format!("[{}]", vec![point; LANDMARKS_PER_HAND].join(","));
        let input = format!("\n{{\"timestampMs\":42.0,\"hands\":[{hand}]}}\n");

        let mut source = JsonlFrameSource::new(Cursor::new(input));
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.timestamp_ms, 42.0);
        assert_eq!(frame.frame.hands.len(), 1);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut source = JsonlFrameSource::new(Cursor::new("{\"timestampMs\":1.0,\"hands\":[[]]}\n"));
        assert!(matches!(
            source.next_frame(),
            Err(FrameError::Malformed(_))
        ));
    }
}
