use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugColor {
    Red,
    Green,
    Blue,
}

/// Marker shown at a world position until its time to live runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugMarker {
    pub color: DebugColor,
    pub position_world: Vec3,
    pub ttl_seconds: f32,
}
