mod entity;
mod markers;

pub use entity::{Entity, EntityId, EntityIdAllocator, EntityKind, EntityWorld, Pickup, Transform};
pub use markers::{DebugColor, DebugMarker};
