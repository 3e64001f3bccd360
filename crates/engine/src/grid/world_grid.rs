use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::math::Vec3;
use crate::world::{DebugColor, DebugMarker, EntityId};

use super::buried::BuriedItem;
use super::config::GridConfig;
use super::coord::{cells_in_rect, GridCoordinate};
use super::layers::CellLayers;
use super::occupancy::{OccupancyRecord, OccupancyTable};
use super::terrain::{DetectionSignal, TerrainType};
use super::GridActor;

const OCCUPANCY_RESERVE: usize = 1000;

/// Fallback origins tried after the desired one: top row left to right,
/// middle row without the center, bottom row left to right.
const ADJACENT_OFFSETS: [GridCoordinate; 8] = [
    GridCoordinate::new(-1, -1),
    GridCoordinate::new(0, -1),
    GridCoordinate::new(1, -1),
    GridCoordinate::new(-1, 0),
    GridCoordinate::new(1, 0),
    GridCoordinate::new(-1, 1),
    GridCoordinate::new(0, 1),
    GridCoordinate::new(1, 1),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid position {position} is out of bounds")]
    OutOfBounds { position: GridCoordinate },
    #[error("footprint {size:?} must be at least 1x1 and fit the grid")]
    InvalidFootprint { size: GridCoordinate },
    #[error("entity {entity:?} is not on the grid")]
    NotOnGrid { entity: EntityId },
    #[error("entity {entity:?} is already on the grid at {position}")]
    AlreadyOnGrid {
        entity: EntityId,
        position: GridCoordinate,
    },
    #[error("no uniform vacant space for footprint {size:?} at or near {position}")]
    SpaceUnavailable {
        position: GridCoordinate,
        size: GridCoordinate,
    },
    #[error("invalid buried item: {reason}")]
    InvalidItem { reason: String },
    #[error("rectangle {start}..{end} is empty or leaves the grid")]
    InvalidRect {
        start: GridCoordinate,
        end: GridCoordinate,
    },
    #[error("terrain {terrain:?} cannot be stored in a cell")]
    InvalidTerrain { terrain: TerrainType },
    #[error("occupancy record for entity {entity:?} disagrees with cell contents")]
    InconsistentOccupancy { entity: EntityId },
}

/// Outcome of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub position: GridCoordinate,
    pub size: GridCoordinate,
    /// True when the entity landed on a neighbour instead of the
    /// requested origin.
    pub adjusted: bool,
}

/// Breaks the world up into a square grid.
///
/// - A cell has exactly one elevation, one terrain type and at most one
///   occupant.
/// - One entity can cover several cells.
/// - Cell (0,0) starts at world origin; every other cell lies in +x / +y.
///
/// The grid owns every layer and the occupancy table. Nothing else writes
/// cells.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    config: GridConfig,
    layers: CellLayers,
    occupancy: OccupancyTable,
}

impl WorldGrid {
    pub fn new(config: GridConfig) -> Self {
        info!(
            width = config.width(),
            world_scale = config.world_scale(),
            cell_count = config.cell_count(),
            "world_grid_initialized"
        );
        Self {
            config,
            layers: CellLayers::new(config.width()),
            occupancy: OccupancyTable::with_capacity(OCCUPANCY_RESERVE),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn width(&self) -> i32 {
        self.config.width() as i32
    }

    pub fn is_valid_position(&self, position: GridCoordinate) -> bool {
        let width = self.width();
        (position.x >= 0 && position.x < width) && (position.y >= 0 && position.y < width)
    }

    // Coordinate transforms. Cell (0,0) covers [0, scale) x [0, scale).

    /// Raw cell containing `world`, truncating toward zero. Not bounds checked.
    pub fn world_to_grid_unchecked(&self, world: Vec3) -> GridCoordinate {
        let scale = self.config.world_scale();
        GridCoordinate {
            x: (world.x / scale) as i32,
            y: (world.y / scale) as i32,
        }
    }

    /// Cell containing `world` plus whether it lies on the grid.
    pub fn world_to_grid(&self, world: Vec3) -> (GridCoordinate, bool) {
        let position = self.world_to_grid_unchecked(world);
        (position, self.is_valid_position(position))
    }

    pub fn grid_position_at(&self, world: Vec3) -> Option<GridCoordinate> {
        let (position, valid) = self.world_to_grid(world);
        valid.then_some(position)
    }

    pub fn grid_to_world_corner(&self, position: GridCoordinate) -> Vec3 {
        let scale = self.config.world_scale();
        Vec3::new(position.x as f32 * scale, position.y as f32 * scale, 0.0)
    }

    pub fn grid_to_world_center(&self, position: GridCoordinate) -> Vec3 {
        let half = self.config.world_scale() / 2.0;
        self.grid_to_world_corner(position) + Vec3::new(half, half, 0.0)
    }

    // Queries. Invalid positions are a normal outcome and read as defaults.

    pub fn terrain_at(&self, position: GridCoordinate) -> TerrainType {
        self.layers
            .index_of(position)
            .map_or(TerrainType::OutOfBounds, |index| self.layers.terrain[index])
    }

    /// 0 is sea level; each step above is one cliff height.
    pub fn elevation_at(&self, position: GridCoordinate) -> i32 {
        self.layers
            .index_of(position)
            .map_or(0, |index| self.layers.elevation[index])
    }

    pub fn occupant_at(&self, position: GridCoordinate) -> Option<EntityId> {
        self.layers
            .index_of(position)
            .and_then(|index| self.layers.occupant[index])
    }

    pub fn buried_item_at(&self, position: GridCoordinate) -> Option<Arc<BuriedItem>> {
        self.layers
            .index_of(position)
            .and_then(|index| self.layers.buried[index].clone())
    }

    pub fn detection_at(&self, position: GridCoordinate) -> DetectionSignal {
        self.layers
            .index_of(position)
            .map_or(DetectionSignal::NONE, |index| self.layers.detection[index])
    }

    pub fn occupancy_of(&self, entity: EntityId) -> Option<OccupancyRecord> {
        self.occupancy.get(entity)
    }

    pub fn is_on_grid(&self, entity: EntityId) -> bool {
        self.occupancy.get(entity).is_some()
    }

    pub fn placed_entity_count(&self) -> usize {
        self.occupancy.len()
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.layers.occupied_count()
    }

    // TODO: allow exceptions such as a house replacing the tree it's placed on.
    pub fn is_space_uniform_and_vacant(&self, start: GridCoordinate, end: GridCoordinate) -> bool {
        let required_elevation = self.elevation_at(start);
        let required_terrain = self.terrain_at(start);

        cells_in_rect(start, end).all(|position| {
            self.is_valid_position(position)
                && self.elevation_at(position) == required_elevation
                && self.terrain_at(position) == required_terrain
                && self.occupant_at(position).is_none()
        })
    }

    /// `None` as well for footprints that cannot fit the grid at all.
    pub fn find_vacant_position_near(
        &self,
        desired: GridCoordinate,
        size: GridCoordinate,
    ) -> Option<GridCoordinate> {
        if !self.footprint_fits(size) {
            return None;
        }
        std::iter::once(desired)
            .chain(
                ADJACENT_OFFSETS
                    .iter()
                    .filter_map(|offset| desired.checked_add(*offset)),
            )
            .find(|origin| {
                origin
                    .checked_add(size)
                    .is_some_and(|end| self.is_space_uniform_and_vacant(*origin, end))
            })
    }

    // Placement and removal.

    pub fn try_place_entity<A>(
        &mut self,
        actor: &mut A,
        desired: GridCoordinate,
        allow_adjust: bool,
    ) -> Result<Placement, GridError>
    where
        A: GridActor + ?Sized,
    {
        let entity = actor.grid_handle();
        let size = actor.footprint_size();

        if !self.footprint_fits(size) {
            warn!(?entity, ?size, "grid_place_rejected_invalid_footprint");
            return Err(GridError::InvalidFootprint { size });
        }
        if !self.is_valid_position(desired) {
            warn!(?entity, position = %desired, "grid_place_rejected_out_of_bounds");
            return Err(GridError::OutOfBounds { position: desired });
        }
        if let Some(existing) = self.occupancy.get(entity) {
            warn!(?entity, position = %existing.position, "grid_place_rejected_already_placed");
            return Err(GridError::AlreadyOnGrid {
                entity,
                position: existing.position,
            });
        }

        let position = if allow_adjust {
            self.find_vacant_position_near(desired, size)
        } else {
            self.is_space_uniform_and_vacant(desired, desired + size)
                .then_some(desired)
        };
        let Some(position) = position else {
            debug!(?entity, position = %desired, ?size, allow_adjust, "grid_place_no_space");
            return Err(GridError::SpaceUnavailable {
                position: desired,
                size,
            });
        };

        let record = OccupancyRecord { position, size };
        self.set_occupant_in_rect(Some(entity), record);
        self.occupancy.insert(entity, record);
        actor.set_grid_position(position);

        debug!(?entity, position = %position, ?size, "grid_entity_placed");
        Ok(Placement {
            position,
            size,
            adjusted: position != desired,
        })
    }

    pub fn remove_entity<A>(&mut self, actor: &mut A) -> Result<OccupancyRecord, GridError>
    where
        A: GridActor + ?Sized,
    {
        let record = self.remove_entity_by_handle(actor.grid_handle())?;
        actor.set_grid_position(GridCoordinate::INVALID);
        Ok(record)
    }

    /// Removal for callers holding only a handle. The entity's own position
    /// mirror is left to the caller.
    pub fn remove_entity_by_handle(
        &mut self,
        entity: EntityId,
    ) -> Result<OccupancyRecord, GridError> {
        let Some(record) = self.occupancy.get(entity) else {
            warn!(?entity, "grid_remove_rejected_not_on_grid");
            return Err(GridError::NotOnGrid { entity });
        };

        let consistent = cells_in_rect(record.position, record.end())
            .all(|position| self.occupant_at(position) == Some(entity));
        if !consistent {
            error!(
                ?entity,
                position = %record.position,
                size = ?record.size,
                "grid_occupancy_drift"
            );
            debug_assert!(consistent, "occupancy record for {entity:?} drifted from cells");
            return Err(GridError::InconsistentOccupancy { entity });
        }

        self.set_occupant_in_rect(None, record);
        self.occupancy.remove(entity);
        debug!(?entity, position = %record.position, "grid_entity_removed");
        Ok(record)
    }

    // Buried items.

    pub fn place_buried_item(
        &mut self,
        item: Option<Arc<BuriedItem>>,
        position: GridCoordinate,
    ) -> Result<(), GridError> {
        let Some(item) = item else {
            warn!(position = %position, "grid_buried_item_rejected_missing");
            return Err(GridError::InvalidItem {
                reason: "no item descriptor".to_string(),
            });
        };
        if let Err(reason) = item.validate() {
            warn!(def_name = %item.def_name, reason, "grid_buried_item_rejected_invalid");
            return Err(GridError::InvalidItem {
                reason: format!("'{}': {reason}", item.def_name),
            });
        }
        let Some(index) = self.layers.index_of(position) else {
            warn!(def_name = %item.def_name, position = %position, "grid_buried_item_rejected_out_of_bounds");
            return Err(GridError::OutOfBounds { position });
        };

        self.layers.buried[index] = Some(Arc::clone(&item));

        // Overlapping fields are not merged; the last write wins.
        let rarity = item.detection_rarity;
        self.for_each_in_radius(position, item.detection_radius, |layers, index, distance| {
            layers.detection[index] = DetectionSignal { rarity, distance };
        });

        debug!(
            def_name = %item.def_name,
            position = %position,
            radius = item.detection_radius,
            rarity,
            "grid_buried_item_placed"
        );
        Ok(())
    }

    pub fn remove_buried_item_at(
        &mut self,
        position: GridCoordinate,
    ) -> Result<Option<Arc<BuriedItem>>, GridError> {
        let Some(index) = self.layers.index_of(position) else {
            warn!(position = %position, "grid_buried_item_remove_out_of_bounds");
            return Err(GridError::OutOfBounds { position });
        };

        let item = self.layers.buried[index].take();
        if let Some(item) = &item {
            // Clears overlapping fields from other items too.
            self.for_each_in_radius(position, item.detection_radius, |layers, index, _| {
                layers.detection[index] = DetectionSignal::NONE;
            });
            debug!(def_name = %item.def_name, position = %position, "grid_buried_item_removed");
        }
        Ok(item)
    }

    // Terrain authoring. Runs before play; gameplay never changes terrain.

    pub fn set_terrain_in_rect(
        &mut self,
        start: GridCoordinate,
        end: GridCoordinate,
        terrain: TerrainType,
    ) -> Result<(), GridError> {
        if terrain == TerrainType::OutOfBounds {
            return Err(GridError::InvalidTerrain { terrain });
        }
        self.check_rect(start, end)?;
        for position in cells_in_rect(start, end) {
            if let Some(index) = self.layers.index_of(position) {
                self.layers.terrain[index] = terrain;
            }
        }
        Ok(())
    }

    pub fn set_elevation_in_rect(
        &mut self,
        start: GridCoordinate,
        end: GridCoordinate,
        elevation: i32,
    ) -> Result<(), GridError> {
        self.check_rect(start, end)?;
        for position in cells_in_rect(start, end) {
            if let Some(index) = self.layers.index_of(position) {
                self.layers.elevation[index] = elevation;
            }
        }
        Ok(())
    }

    pub fn debug_draw_position(
        &self,
        position: GridCoordinate,
        display_seconds: f32,
        color: DebugColor,
    ) -> DebugMarker {
        let position_world = self.grid_to_world_center(position);
        debug!(
            position = %position,
            display_seconds,
            ?color,
            "grid_debug_draw"
        );
        DebugMarker {
            color,
            position_world,
            ttl_seconds: display_seconds,
        }
    }

    fn check_rect(&self, start: GridCoordinate, end: GridCoordinate) -> Result<(), GridError> {
        let width = self.width();
        let inside = self.is_valid_position(start)
            && start.x < end.x
            && start.y < end.y
            && end.x <= width
            && end.y <= width;
        if inside {
            Ok(())
        } else {
            Err(GridError::InvalidRect { start, end })
        }
    }

    fn footprint_fits(&self, size: GridCoordinate) -> bool {
        let width = self.width();
        (1..=width).contains(&size.x) && (1..=width).contains(&size.y)
    }

    fn set_occupant_in_rect(&mut self, occupant: Option<EntityId>, record: OccupancyRecord) {
        for position in cells_in_rect(record.position, record.end()) {
            match self.layers.index_of(position) {
                Some(index) => self.layers.occupant[index] = occupant,
                None => debug_assert!(false, "occupancy rectangle left the grid at {position}"),
            }
        }
    }

    /// Visits the cells of the radius square around `center` that lie on
    /// the grid. `center` must be valid.
    fn for_each_in_radius(
        &mut self,
        center: GridCoordinate,
        radius: i32,
        mut write: impl FnMut(&mut CellLayers, usize, i32),
    ) {
        let last = self.width() - 1;
        let (min_x, max_x) = (
            center.x.saturating_sub(radius).max(0),
            center.x.saturating_add(radius).min(last),
        );
        let (min_y, max_y) = (
            center.y.saturating_sub(radius).max(0),
            center.y.saturating_add(radius).min(last),
        );
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let position = GridCoordinate::new(x, y);
                if let Some(index) = self.layers.index_of(position) {
                    write(&mut self.layers, index, center.chebyshev_distance(position));
                }
            }
        }
    }
}
