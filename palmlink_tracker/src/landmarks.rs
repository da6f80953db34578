use serde::{Deserialize, Serialize};

/// One normalized landmark: x,y in [0,1] image space, z is relative depth.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar distance. Every classifier threshold is defined on the x/y
    /// plane of the normalized landmark space.
    pub fn planar_distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

pub const LANDMARKS_PER_HAND: usize = 21;

// Named landmark indices of the 21-point hand model.
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// One detected hand: an ordered, fixed-size set of 21 landmarks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Hand(pub [Point; LANDMARKS_PER_HAND]);

impl Hand {
    pub fn wrist(&self) -> &Point {
        &self.0[WRIST]
    }

    pub fn thumb_tip(&self) -> &Point {
        &self.0[THUMB_TIP]
    }

    pub fn index_mcp(&self) -> &Point {
        &self.0[INDEX_MCP]
    }

    pub fn index_tip(&self) -> &Point {
        &self.0[INDEX_TIP]
    }

    pub fn middle_tip(&self) -> &Point {
        &self.0[MIDDLE_TIP]
    }

    pub fn ring_tip(&self) -> &Point {
        &self.0[RING_TIP]
    }

    pub fn pinky_mcp(&self) -> &Point {
        &self.0[PINKY_MCP]
    }

    pub fn pinky_tip(&self) -> &Point {
        &self.0[PINKY_TIP]
    }
}

/// One frame of hand observations: zero, one, or two hands.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HandFrame {
    pub hands: Vec<Hand>,
}

impl HandFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn primary(&self) -> Option<&Hand> {
        self.hands.first()
    }

    pub fn secondary(&self) -> Option<&Hand> {
        self.hands.get(1)
    }
}

/// Remap normalized image coordinates to the symmetric app space
/// ([-1.25, 1.25] per axis, x mirrored, y flipped so up is positive).
pub fn remap_to_app_space(x: f32, y: f32) -> [f32; 2] {
    [(x - 0.5) * -2.5, -(y - 0.5) * 2.5]
}
