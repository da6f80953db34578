use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete workspace-navigation command (four swipe directions).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAction {
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::SwipeLeft => "SWIPE_LEFT",
            ControlAction::SwipeRight => "SWIPE_RIGHT",
            ControlAction::SwipeUp => "SWIPE_UP",
            ControlAction::SwipeDown => "SWIPE_DOWN",
        }
    }
}

impl std::str::FromStr for ControlAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SWIPE_LEFT" => Ok(ControlAction::SwipeLeft),
            "SWIPE_RIGHT" => Ok(ControlAction::SwipeRight),
            "SWIPE_UP" => Ok(ControlAction::SwipeUp),
            "SWIPE_DOWN" => Ok(ControlAction::SwipeDown),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown control action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

/// Pointer operation kind. Every kind carries absolute screen coordinates
/// on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MouseKind {
    Move,
    Down,
    Drag,
    Up,
    RightClick,
}

/// A pointer operation at absolute screen coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseKind,
    pub x: f64,
    pub y: f64,
}

impl MouseEvent {
    pub fn new(kind: MouseKind, x: f64, y: f64) -> Self {
        Self { kind, x, y }
    }
}

/// Discrete per-frame gesture label. At most one per frame, by strict
/// priority PINCH > POINT > FOUR_FINGERS > OPEN_PALM > NONE.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    #[default]
    None,
    Pinch,
    Point,
    FourFingers,
    OpenPalm,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::None => "NONE",
            Gesture::Pinch => "PINCH",
            Gesture::Point => "POINT",
            Gesture::FourFingers => "FOUR_FINGERS",
            Gesture::OpenPalm => "OPEN_PALM",
        }
    }
}

/// Tagged controller→host command. The `Mouse` variant keeps the pointer
/// kind in a `mouseType` field so it cannot collide with the envelope tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerCommand {
    Control {
        action: ControlAction,
    },
    Mouse {
        #[serde(rename = "mouseType")]
        mouse_type: MouseKind,
        x: f64,
        y: f64,
    },
}

impl PeerCommand {
    pub fn control(action: ControlAction) -> Self {
        PeerCommand::Control { action }
    }

    pub fn mouse(event: MouseEvent) -> Self {
        PeerCommand::Mouse {
            mouse_type: event.kind,
            x: event.x,
            y: event.y,
        }
    }
}

/// Anything a peer may send over the link: a recognized tagged command, or
/// an opaque object treated as display-only auxiliary telemetry. Variant
/// order matters — commands are tried first, everything else falls through
/// to `State` and is never dispatched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PeerMessage {
    Command(PeerCommand),
    State(serde_json::Value),
}

/// Display-only telemetry a controller broadcasts each frame. Field names
/// match the hosted display contract.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GestureSnapshot {
    pub hand_position: [f32; 3],
    pub is_pinching: bool,
    pub is_open_palm: bool,
    pub gesture: Gesture,
}

/// `POST /api/control` request body. The action arrives as a raw string so
/// an unrecognized value can be answered with 400 rather than a decode
/// failure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ControlRequest {
    pub action: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ControlOk {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ControlFailure {
    pub error: String,
}

/// Relay-hub channel names. The hub itself is an external collaborator;
/// only the contract it must carry is fixed here.
pub mod hub {
    pub const JOIN_HOST: &str = "join-host";
    pub const JOIN_CONTROLLER: &str = "join-controller";
    pub const GESTURE_DATA: &str = "gesture-data";
    pub const GESTURE_UPDATE: &str = "gesture-update";
    pub const MOUSE_DATA: &str = "mouse-data";
}
