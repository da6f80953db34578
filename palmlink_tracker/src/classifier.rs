use crate::landmarks::{remap_to_app_space, HandFrame, Point};
use palmlink_protocol::{Gesture, GestureSnapshot};

/// Distance thresholds for the per-frame geometry tests, in normalized
/// landmark space.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Fingertip↔wrist distance above which a finger counts as extended.
    pub finger_extend: f32,
    /// Thumb-tip↔pinky-MCP distance above which the thumb counts as
    /// extended (large when spread, small when tucked across the palm).
    pub thumb_extend: f32,
    /// Index-tip↔thumb-tip distance below which the hand is pinching.
    /// The boundary is exclusive: a distance of exactly `pinch` is not a
    /// pinch.
    pub pinch: f32,
    /// Middle-tip↔thumb-tip distance below which the right-click pinch is
    /// active.
    pub middle_pinch: f32,
    /// Exponential smoothing factor, applied to position only.
    pub smoothing: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            finger_extend: 0.10,
            thumb_extend: 0.15,
            pinch: 0.06,
            middle_pinch: 0.05,
            smoothing: 0.2,
        }
    }
}

/// Per-frame classification result. `position` is smoothed across frames;
/// every flag is instantaneous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub position: [f32; 3],
    pub pinching: bool,
    pub middle_pinching: bool,
    pub pointing: bool,
    pub four_fingers_extended: bool,
    pub open_palm: bool,
    pub gesture: Gesture,
    /// Raw index tip, carried for screen-coordinate mapping downstream.
    pub index_tip: Point,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            pinching: false,
            middle_pinching: false,
            pointing: false,
            four_fingers_extended: false,
            open_palm: false,
            gesture: Gesture::None,
            index_tip: Point::default(),
        }
    }
}

impl GestureState {
    /// Telemetry view for the auxiliary broadcast channel.
    pub fn snapshot(&self) -> GestureSnapshot {
        GestureSnapshot {
            hand_position: self.position,
            is_pinching: self.pinching,
            is_open_palm: self.open_palm,
            gesture: self.gesture,
        }
    }
}

/// Turns one frame of landmarks into a `GestureState`. Holds only the
/// position-smoothing state; everything else is derived per frame.
pub struct Classifier {
    config: ClassifierConfig,
    smoothed: [f32; 3],
    last_index_tip: Point,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            smoothed: [0.0; 3],
            last_index_tip: Point::default(),
        }
    }

    /// Clear the smoothing state (camera/model pipeline restart).
    pub fn reset(&mut self) {
        self.smoothed = [0.0; 3];
        self.last_index_tip = Point::default();
    }

    /// Classify one frame. With zero detected hands every flag resets and
    /// the gesture is NONE, while the smoothed position holds its last
    /// value.
    pub fn classify(&mut self, frame: &HandFrame) -> GestureState {
        let Some(hand) = frame.primary() else {
            return GestureState {
                position: self.smoothed,
                index_tip: self.last_index_tip,
                ..GestureState::default()
            };
        };

        let wrist = hand.wrist();
        let thumb = hand.thumb_tip();
        let index = hand.index_tip();

        let extended = |tip: &Point| tip.planar_distance(wrist) > self.config.finger_extend;
        let index_extended = extended(index);
        let middle_extended = extended(hand.middle_tip());
        let ring_extended = extended(hand.ring_tip());
        let pinky_extended = extended(hand.pinky_tip());
        // Thumb-tip↔pinky-MCP is large when the thumb is spread and small
        // when it is tucked across the palm.
        let thumb_extended = thumb.planar_distance(hand.pinky_mcp()) > self.config.thumb_extend;

        let four_fingers_extended =
            index_extended && middle_extended && ring_extended && pinky_extended;
        let pinching = index.planar_distance(thumb) < self.config.pinch;
        let middle_pinching = hand.middle_tip().planar_distance(thumb) < self.config.middle_pinch;
        let pointing = index_extended && !middle_extended && !ring_extended && !pinky_extended;

        // Four fingers requires the thumb tucked; open palm requires it
        // spread.
        let four_fingers = four_fingers_extended && !thumb_extended;
        let open_palm = four_fingers_extended && thumb_extended && !pinching;

        let gesture = if pinching {
            Gesture::Pinch
        } else if pointing {
            Gesture::Point
        } else if four_fingers {
            Gesture::FourFingers
        } else if open_palm {
            Gesture::OpenPalm
        } else {
            Gesture::None
        };

        let [raw_x, raw_y] = remap_to_app_space(index.x, index.y);
        let alpha = self.config.smoothing;
        self.smoothed[0] = lerp(self.smoothed[0], raw_x, alpha);
        self.smoothed[1] = lerp(self.smoothed[1], raw_y, alpha);
        self.smoothed[2] = 0.0;
        self.last_index_tip = *index;

        GestureState {
            position: self.smoothed,
            pinching,
            middle_pinching,
            pointing,
            four_fingers_extended,
            open_palm,
            gesture,
            index_tip: *index,
        }
    }
}

fn lerp(start: f32, end: f32, factor: f32) -> f32 {
    start + (end - start) * factor
}
