//! Uniform square world grid: terrain, elevation, occupancy and buried
//! items, plus the placement rules every requestor goes through.

mod buried;
mod config;
mod coord;
mod layers;
mod occupancy;
mod terrain;
mod world_grid;

pub use buried::BuriedItem;
pub use config::{
    GridConfig, GridConfigError, DEFAULT_GRID_WIDTH, DEFAULT_WORLD_SCALE, GRID_WIDTH_MAX,
    GRID_WIDTH_MIN,
};
pub use coord::GridCoordinate;
pub use occupancy::OccupancyRecord;
pub use terrain::{DetectionSignal, TerrainType};
pub use world_grid::{GridError, Placement, WorldGrid};

use crate::world::EntityId;

/// Capability for anything that can be placed on the grid.
///
/// The grid's occupancy table is authoritative; `grid_position` is a mirror
/// the grid writes on placement and invalidates on removal.
pub trait GridActor {
    fn grid_handle(&self) -> EntityId;
    /// Footprint in cells. Both dimensions must be at least 1.
    fn footprint_size(&self) -> GridCoordinate;
    fn grid_position(&self) -> GridCoordinate;
    fn set_grid_position(&mut self, position: GridCoordinate);
}
