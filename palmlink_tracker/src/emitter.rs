use crate::classifier::GestureState;
use palmlink_protocol::{ControlAction, Gesture, MouseEvent, MouseKind};
use std::time::{Duration, Instant};
use tracing::debug;

/// Emitter tuning. Screen geometry maps the normalized index tip onto
/// absolute pointer coordinates.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub screen_width: f64,
    pub screen_height: f64,
    /// Smoothed-position delta (per axis) that qualifies as a swipe.
    pub swipe_threshold: f32,
    /// Shared refractory window across all four swipe directions.
    pub swipe_refractory: Duration,
    /// Refractory window for right-click emission.
    pub right_click_refractory: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920.0,
            screen_height: 1080.0,
            swipe_threshold: 0.04,
            swipe_refractory: Duration::from_millis(500),
            right_click_refractory: Duration::from_millis(1000),
        }
    }
}

/// Pointer lifecycle phase. Transitions happen only on pinch edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPhase {
    #[default]
    Idle,
    Down,
    Dragging,
}

/// A command produced by one frame of gesture input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Control(ControlAction),
    Mouse(MouseEvent),
}

/// Consumes successive `GestureState`s and emits pointer and swipe
/// commands. Owns the pointer lifecycle and both refractory timers; the
/// caller supplies each frame's clock so the windows are deterministic
/// under test.
pub struct CommandEmitter {
    config: EmitterConfig,
    phase: PointerPhase,
    cursor: (f64, f64),
    prev_position: Option<[f32; 2]>,
    last_swipe: Option<Instant>,
    last_right_click: Option<Instant>,
}

impl CommandEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            phase: PointerPhase::Idle,
            cursor: (0.0, 0.0),
            prev_position: None,
            last_swipe: None,
            last_right_click: None,
        }
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    /// Last-known screen coordinates.
    pub fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    /// Feed one classifier frame; returns zero or more commands.
    pub fn update(&mut self, state: &GestureState, now: Instant) -> Vec<Command> {
        let mut out = Vec::new();

        let x = (1.0 - f64::from(state.index_tip.x)) * self.config.screen_width;
        let y = f64::from(state.index_tip.y) * self.config.screen_height;
        self.cursor = (x, y);

        if state.pinching {
            match self.phase {
                PointerPhase::Idle => {
                    self.phase = PointerPhase::Down;
                    out.push(Command::Mouse(MouseEvent::new(MouseKind::Down, x, y)));
                }
                PointerPhase::Down | PointerPhase::Dragging => {
                    self.phase = PointerPhase::Dragging;
                    out.push(Command::Mouse(MouseEvent::new(MouseKind::Drag, x, y)));
                }
            }
        } else {
            match self.phase {
                PointerPhase::Down | PointerPhase::Dragging => {
                    self.phase = PointerPhase::Idle;
                    out.push(Command::Mouse(MouseEvent::new(MouseKind::Up, x, y)));
                }
                PointerPhase::Idle => {
                    if state.pointing {
                        out.push(Command::Mouse(MouseEvent::new(MouseKind::Move, x, y)));
                    }
                }
            }
        }

        // Right-click runs independently of the drag machine.
        if state.middle_pinching
            && elapsed(self.last_right_click, self.config.right_click_refractory, now)
        {
            self.last_right_click = Some(now);
            out.push(Command::Mouse(MouseEvent::new(MouseKind::RightClick, x, y)));
        }

        if let Some(action) = self.detect_swipe(state, now) {
            self.last_swipe = Some(now);
            debug!(action = action.as_str(), "swipe emitted");
            out.push(Command::Control(action));
        }
        self.prev_position = Some([state.position[0], state.position[1]]);

        out
    }

    /// Swipes are only evaluated while the gesture is FOUR_FINGERS. The x
    /// axis is checked first: a frame whose x and y deltas both qualify
    /// yields the horizontal swipe.
    fn detect_swipe(&self, state: &GestureState, now: Instant) -> Option<ControlAction> {
        if state.gesture != Gesture::FourFingers {
            return None;
        }
        let prev = self.prev_position?;
        if !elapsed(self.last_swipe, self.config.swipe_refractory, now) {
            return None;
        }

        let threshold = self.config.swipe_threshold;
        let dx = state.position[0] - prev[0];
        let dy = state.position[1] - prev[1];

        if dx > threshold {
            Some(ControlAction::SwipeRight)
        } else if dx < -threshold {
            Some(ControlAction::SwipeLeft)
        } else if dy > threshold {
            Some(ControlAction::SwipeUp)
        } else if dy < -threshold {
            Some(ControlAction::SwipeDown)
        } else {
            None
        }
    }

    /// Reset for a camera/device restart. An in-progress drag is closed
    /// out with a final `UP` at the last-known cursor position so the
    /// pointer is never left held down.
    pub fn reset(&mut self) -> Option<Command> {
        self.prev_position = None;
        let up = match self.phase {
            PointerPhase::Down | PointerPhase::Dragging => Some(Command::Mouse(MouseEvent::new(
                MouseKind::Up,
                self.cursor.0,
                self.cursor.1,
            ))),
            PointerPhase::Idle => None,
        };
        self.phase = PointerPhase::Idle;
        up
    }
}

fn elapsed(last: Option<Instant>, window: Duration, now: Instant) -> bool {
    match last {
        Some(at) => now.duration_since(at) >= window,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point;

    fn emitter() -> CommandEmitter {
        CommandEmitter::new(EmitterConfig::default())
    }

    fn state() -> GestureState {
        GestureState {
            index_tip: Point::new(0.25, 0.5, 0.0),
            ..GestureState::default()
        }
    }

    fn pinch() -> GestureState {
        GestureState {
            pinching: true,
            gesture: Gesture::Pinch,
            ..state()
        }
    }

    fn pointing() -> GestureState {
        GestureState {
            pointing: true,
            gesture: Gesture::Point,
            ..state()
        }
    }

    fn four_fingers(x: f32, y: f32) -> GestureState {
        GestureState {
            four_fingers_extended: true,
            gesture: Gesture::FourFingers,
            position: [x, y, 0.0],
            ..state()
        }
    }

    fn mouse_kinds(commands: &[Command]) -> Vec<MouseKind> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Mouse(e) => Some(e.kind),
                Command::Control(_) => None,
            })
            .collect()
    }

    #[test]
    fn pinch_start_emits_down_at_mapped_coordinates() {
        // Scenario: index tip (0.25, 0.5) on a 1920x1080 screen.
        let mut emitter = emitter();
        let out = emitter.update(&pinch(), Instant::now());
        assert_eq!(
            out,
            vec![Command::Mouse(MouseEvent::new(MouseKind::Down, 1440.0, 540.0))]
        );
        assert_eq!(emitter.phase(), PointerPhase::Down);
    }

    #[test]
    fn pinch_interval_yields_one_down_one_up_no_moves() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        let mut all = Vec::new();
        for i in 0..4 {
            all.extend(emitter.update(&pinch(), t0 + Duration::from_millis(i * 33)));
        }
        all.extend(emitter.update(&state(), t0 + Duration::from_millis(132)));

        let kinds = mouse_kinds(&all);
        assert_eq!(kinds.iter().filter(|k| **k == MouseKind::Down).count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == MouseKind::Up).count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == MouseKind::Drag).count(), 3);
        assert!(!kinds.contains(&MouseKind::Move));
        assert_eq!(kinds.first(), Some(&MouseKind::Down));
        assert_eq!(kinds.last(), Some(&MouseKind::Up));
        assert_eq!(emitter.phase(), PointerPhase::Idle);
    }

    #[test]
    fn pointing_emits_move_every_frame() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        for i in 0..3 {
            let out = emitter.update(&pointing(), t0 + Duration::from_millis(i * 33));
            assert_eq!(mouse_kinds(&out), vec![MouseKind::Move]);
        }
    }

    #[test]
    fn no_move_while_pinching_even_if_pointing() {
        let mut emitter = emitter();
        let both = GestureState {
            pointing: true,
            ..pinch()
        };
        let out = emitter.update(&both, Instant::now());
        assert_eq!(mouse_kinds(&out), vec![MouseKind::Down]);
    }

    #[test]
    fn right_click_refractory_blocks_600ms_allows_1200ms() {
        let mut emitter = emitter();
        let middle = GestureState {
            middle_pinching: true,
            ..state()
        };
        let t0 = Instant::now();

        let first = emitter.update(&middle, t0);
        assert_eq!(mouse_kinds(&first), vec![MouseKind::RightClick]);

        let second = emitter.update(&middle, t0 + Duration::from_millis(600));
        assert!(mouse_kinds(&second).is_empty());

        let third = emitter.update(&middle, t0 + Duration::from_millis(1200));
        assert_eq!(mouse_kinds(&third), vec![MouseKind::RightClick]);
    }

    #[test]
    fn right_click_fires_alongside_drag_machine() {
        let mut emitter = emitter();
        let both = GestureState {
            middle_pinching: true,
            ..pinch()
        };
        let out = emitter.update(&both, Instant::now());
        assert_eq!(mouse_kinds(&out), vec![MouseKind::Down, MouseKind::RightClick]);
    }

    #[test]
    fn four_finger_delta_emits_single_swipe_right() {
        // Scenario: +0.05 x-delta across two FOUR_FINGERS frames.
        let mut emitter = emitter();
        let t0 = Instant::now();
        assert!(emitter.update(&four_fingers(0.0, 0.0), t0).is_empty());
        let out = emitter.update(&four_fingers(0.05, 0.0), t0 + Duration::from_millis(33));
        assert_eq!(out, vec![Command::Control(ControlAction::SwipeRight)]);
    }

    #[test]
    fn swipe_refractory_is_shared_across_directions() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        emitter.update(&four_fingers(0.0, 0.0), t0);
        let first = emitter.update(&four_fingers(0.05, 0.0), t0 + Duration::from_millis(33));
        assert_eq!(first.len(), 1);

        // A qualifying downward delta 200ms later is swallowed.
        let second = emitter.update(&four_fingers(0.05, -0.08), t0 + Duration::from_millis(233));
        assert!(second.is_empty());

        // Past the window the shared timer re-arms.
        let third = emitter.update(&four_fingers(0.05, -0.16), t0 + Duration::from_millis(600));
        assert_eq!(third, vec![Command::Control(ControlAction::SwipeDown)]);
    }

    #[test]
    fn x_axis_wins_when_both_axes_qualify() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        emitter.update(&four_fingers(0.0, 0.0), t0);
        let out = emitter.update(&four_fingers(0.05, 0.08), t0 + Duration::from_millis(33));
        assert_eq!(out, vec![Command::Control(ControlAction::SwipeRight)]);
    }

    #[test]
    fn no_swipe_outside_four_fingers() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        let palm = GestureState {
            position: [0.0, 0.0, 0.0],
            gesture: Gesture::OpenPalm,
            ..state()
        };
        emitter.update(&palm, t0);
        let moved = GestureState {
            position: [0.2, 0.0, 0.0],
            ..palm
        };
        assert!(emitter
            .update(&moved, t0 + Duration::from_millis(33))
            .is_empty());
    }

    #[test]
    fn reset_mid_drag_emits_final_up() {
        let mut emitter = emitter();
        let t0 = Instant::now();
        emitter.update(&pinch(), t0);
        emitter.update(&pinch(), t0 + Duration::from_millis(33));
        assert_eq!(emitter.phase(), PointerPhase::Dragging);

        let up = emitter.reset();
        assert_eq!(
            up,
            Some(Command::Mouse(MouseEvent::new(MouseKind::Up, 1440.0, 540.0)))
        );
        assert_eq!(emitter.phase(), PointerPhase::Idle);
        assert_eq!(emitter.reset(), None);
    }
}
