use crate::landmarks::{remap_to_app_space, HandFrame};

/// Tuning for the two-hand transform.
#[derive(Debug, Clone)]
pub struct TwoHandConfig {
    /// Wrist-to-wrist distance → zoom multiplier before clamping.
    pub zoom_scale: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
}

impl Default for TwoHandConfig {
    fn default() -> Self {
        Self {
            zoom_scale: 4.0,
            zoom_min: 0.5,
            zoom_max: 3.0,
        }
    }
}

/// Transform derived from a two-hand frame, independent of the primary
/// hand's gesture state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPairState {
    pub zoom: f32,
    /// Planar rotation of the wrist-to-wrist axis, radians.
    pub rotation: f32,
    /// Midpoint between the wrists, remapped like the pointer position.
    pub midpoint: [f32; 2],
}

/// `None` unless the frame carries two hands.
pub fn derive(frame: &HandFrame, config: &TwoHandConfig) -> Option<HandPairState> {
    let a = frame.primary()?.wrist();
    let b = frame.secondary()?.wrist();

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let zoom = (dx.hypot(dy) * config.zoom_scale).clamp(config.zoom_min, config.zoom_max);

    Some(HandPairState {
        zoom,
        rotation: dy.atan2(dx),
        midpoint: remap_to_app_space((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
    })
}
