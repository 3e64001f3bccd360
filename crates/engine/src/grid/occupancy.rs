use std::collections::HashMap;

use crate::world::EntityId;

use super::coord::GridCoordinate;

/// Where a placed entity sits and how many cells it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyRecord {
    pub position: GridCoordinate,
    pub size: GridCoordinate,
}

impl OccupancyRecord {
    /// Exclusive far corner of the footprint.
    pub fn end(&self) -> GridCoordinate {
        self.position + self.size
    }

    pub fn is_valid(&self) -> bool {
        self.position.x >= 0 && self.position.y >= 0 && self.size.x >= 1 && self.size.y >= 1
    }
}

/// Side table from entity handle to occupancy record. Absence means the
/// entity is not on the grid.
#[derive(Debug, Default, Clone)]
pub(crate) struct OccupancyTable {
    records: HashMap<EntityId, OccupancyRecord>,
}

impl OccupancyTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn get(&self, entity: EntityId) -> Option<OccupancyRecord> {
        self.records
            .get(&entity)
            .copied()
            .filter(OccupancyRecord::is_valid)
    }

    pub(crate) fn insert(&mut self, entity: EntityId, record: OccupancyRecord) {
        self.records.insert(entity, record);
    }

    pub(crate) fn remove(&mut self, entity: EntityId) -> Option<OccupancyRecord> {
        self.records.remove(&entity)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
