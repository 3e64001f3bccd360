use tracing::debug;

use crate::grid::{GridActor, GridCoordinate};
use crate::math::Vec3;

use super::markers::DebugMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Prop,
    Drop,
    GridMarker,
    Placeable,
}

/// Item stack that can be lying on the ground or dug up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pickup {
    pub def_name: String,
    pub stack_size: u8,
    pub quality: u8,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub debug_name: String,
    pub kind: EntityKind,
    pub pickup: Option<Pickup>,
    pub grid_footprint: GridCoordinate,
    grid_position: GridCoordinate,
}

impl GridActor for Entity {
    fn grid_handle(&self) -> EntityId {
        self.id
    }

    fn footprint_size(&self) -> GridCoordinate {
        self.grid_footprint
    }

    fn grid_position(&self) -> GridCoordinate {
        self.grid_position
    }

    fn set_grid_position(&mut self, position: GridCoordinate) {
        self.grid_position = position;
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Create/destroy service for entities. Spawns and despawns are queued and
/// take effect in `apply_pending`; pending spawns are already reachable
/// through `find_entity_mut` so they can be finished before going live.
#[derive(Debug, Default)]
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    debug_markers: Vec<DebugMarker>,
}

impl EntityWorld {
    pub fn spawn(
        &mut self,
        transform: Transform,
        debug_name: impl Into<String>,
        kind: EntityKind,
        grid_footprint: GridCoordinate,
    ) -> EntityId {
        let id = self.allocator.allocate();
        let debug_name = debug_name.into();
        debug!(id = id.0, debug_name = %debug_name, ?kind, "entity_spawn_queued");
        self.pending_spawns.push(Entity {
            id,
            transform,
            debug_name,
            kind,
            pickup: None,
            grid_footprint,
            grid_position: GridCoordinate::INVALID,
        });
        id
    }

    /// Queues an entity and hands it back so it can be finished (placed,
    /// moved) before `apply_pending` makes it live.
    pub fn spawn_deferred(
        &mut self,
        transform: Transform,
        debug_name: impl Into<String>,
        kind: EntityKind,
        grid_footprint: GridCoordinate,
    ) -> &mut Entity {
        self.spawn(transform, debug_name, kind, grid_footprint);
        let index = self.pending_spawns.len() - 1;
        &mut self.pending_spawns[index]
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            let is_doomed = |entity: &Entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_ok()
            };
            self.entities.retain(|entity| !is_doomed(entity));
            self.pending_spawns.retain(|entity| !is_doomed(entity));
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
    }

    pub fn push_debug_marker(&mut self, marker: DebugMarker) {
        self.debug_markers.push(marker);
    }

    pub fn debug_markers(&self) -> &[DebugMarker] {
        &self.debug_markers
    }

    pub fn tick_debug_markers(&mut self, fixed_dt_seconds: f32) {
        self.debug_markers.retain_mut(|marker| {
            marker.ttl_seconds -= fixed_dt_seconds;
            marker.ttl_seconds > 0.0
        });
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }
}
