use engine::{EntityId, EntityKind, GridCoordinate, GridError, Pickup, Vec3};
use thiserror::Error;
use tracing::{error, info, warn};

use super::session::{CellAnchor, GridSpawnRequest, Session};

#[derive(Debug, Error, PartialEq)]
pub(crate) enum DropError {
    #[error("pickup has an empty item name")]
    EmptyItem,
    #[error("pickup '{def_name}' has a stack size of 0")]
    ZeroStackSize { def_name: String },
    #[error("pickup '{def_name}' has a quality of 0")]
    ZeroQuality { def_name: String },
    #[error("drop position {position} is not on the grid")]
    InvalidPosition { position: GridCoordinate },
    #[error("world location ({x}, {y}) is not on the grid")]
    OffGrid { x: f32, y: f32 },
    #[error("no room to drop item near {position}")]
    NoRoom { position: GridCoordinate },
    #[error(transparent)]
    Grid(#[from] GridError),
}

fn validate_pickup(pickup: &Pickup) -> Result<(), DropError> {
    if pickup.def_name.trim().is_empty() {
        return Err(DropError::EmptyItem);
    }
    if pickup.stack_size == 0 {
        return Err(DropError::ZeroStackSize {
            def_name: pickup.def_name.clone(),
        });
    }
    if pickup.quality == 0 {
        return Err(DropError::ZeroQuality {
            def_name: pickup.def_name.clone(),
        });
    }
    Ok(())
}

impl Session {
    /// Spawns a drop standing at the center of `position`, or a neighbour of
    /// it when that cell is taken.
    pub(crate) fn new_drop(
        &mut self,
        position: GridCoordinate,
        pickup: Pickup,
    ) -> Result<EntityId, DropError> {
        if let Err(err) = validate_pickup(&pickup) {
            error!(error = %err, "drop_rejected_invalid_pickup");
            return Err(err);
        }
        if !self.grid.is_valid_position(position) {
            warn!(position = %position, "drop_rejected_invalid_position");
            return Err(DropError::InvalidPosition { position });
        }

        let debug_name = format!("drop_{}_{}", pickup.def_name, self.drop_count);
        self.drop_count = self.drop_count.saturating_add(1);

        let (id, placement) = self.spawn_on_grid(GridSpawnRequest {
            debug_name,
            kind: EntityKind::Drop,
            footprint: GridCoordinate::ONE,
            desired: position,
            allow_adjust: true,
            anchor: CellAnchor::Center,
            pickup: Some(pickup),
        })?;
        info!(id = id.0, position = %placement.position, "drop_spawned");
        Ok(id)
    }

    /// Drops at the first vacant cell at or around `world_location`.
    pub(crate) fn drop_item_near(
        &mut self,
        world_location: Vec3,
        pickup: Pickup,
    ) -> Result<EntityId, DropError> {
        let Some(desired) = self.grid.grid_position_at(world_location) else {
            warn!(x = world_location.x, y = world_location.y, "drop_location_off_grid");
            return Err(DropError::OffGrid {
                x: world_location.x,
                y: world_location.y,
            });
        };
        let Some(position) = self
            .grid
            .find_vacant_position_near(desired, GridCoordinate::ONE)
        else {
            warn!(position = %desired, "no room to drop item");
            return Err(DropError::NoRoom { position: desired });
        };
        self.new_drop(position, pickup)
    }

    /// Picks up the drop standing at `world_location`. Anything else on the
    /// cell is left alone.
    pub(crate) fn try_pickup(&mut self, world_location: Vec3) -> Option<Pickup> {
        let position = self.grid.grid_position_at(world_location)?;
        let id = self.grid.occupant_at(position)?;
        let entity = self.world.find_entity_mut(id)?;
        if entity.kind != EntityKind::Drop {
            return None;
        }
        if let Err(err) = self.grid.remove_entity(entity) {
            warn!(id = id.0, error = %err, "pickup_remove_failed");
            return None;
        }
        let pickup = entity.pickup.take();
        self.world.despawn(id);
        info!(id = id.0, position = %position, "drop_picked_up");
        pickup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{cell_center, test_session};

    fn coin(stack_size: u8, quality: u8) -> Pickup {
        Pickup {
            def_name: "item.coin".to_string(),
            stack_size,
            quality,
        }
    }

    #[test]
    fn invalid_pickups_are_rejected_without_spawning() {
        let mut session = test_session();
        let origin = GridCoordinate::new(0, 0);
        assert!(matches!(
            session.new_drop(origin, coin(0, 1)),
            Err(DropError::ZeroStackSize { .. })
        ));
        assert!(matches!(
            session.new_drop(origin, coin(1, 0)),
            Err(DropError::ZeroQuality { .. })
        ));
        let nameless = Pickup {
            def_name: " ".to_string(),
            stack_size: 1,
            quality: 1,
        };
        assert_eq!(session.new_drop(origin, nameless), Err(DropError::EmptyItem));
        assert_eq!(
            session.new_drop(GridCoordinate::new(4, 0), coin(1, 1)),
            Err(DropError::InvalidPosition {
                position: GridCoordinate::new(4, 0)
            })
        );
        session.world.apply_pending();
        assert_eq!(session.world.entity_count(), 0);
        assert_eq!(session.drop_count, 0);
    }

    #[test]
    fn drop_lands_centered_and_adjusts_when_taken() {
        let mut session = test_session();
        let first = session
            .new_drop(GridCoordinate::new(1, 1), coin(1, 1))
            .expect("first");
        let second = session
            .new_drop(GridCoordinate::new(1, 1), coin(2, 1))
            .expect("second");
        session.world.apply_pending();

        let first = session.world.find_entity(first).expect("first entity");
        assert_eq!(first.transform.position, Vec3::new(150.0, 150.0, 0.0));
        // North-west neighbour is tried first.
        assert_eq!(session.grid.occupant_at(GridCoordinate::new(0, 0)), Some(second));
    }

    #[test]
    fn drop_fails_when_neighbourhood_is_full() {
        let mut session = test_session();
        for _ in 0..9 {
            session
                .new_drop(GridCoordinate::new(1, 1), coin(1, 1))
                .expect("fill");
        }
        let err = session
            .new_drop(GridCoordinate::new(1, 1), coin(1, 1))
            .expect_err("full");
        assert!(matches!(err, DropError::Grid(GridError::SpaceUnavailable { .. })));
        session.world.apply_pending();
        assert_eq!(session.world.entity_count(), 9);

        let err = session
            .drop_item_near(cell_center(GridCoordinate::new(1, 1)), coin(1, 1))
            .expect_err("no room");
        assert_eq!(
            err,
            DropError::NoRoom {
                position: GridCoordinate::new(1, 1)
            }
        );
    }

    #[test]
    fn drop_item_near_off_grid_is_rejected() {
        let mut session = test_session();
        let err = session
            .drop_item_near(Vec3::new(1000.0, 10.0, 0.0), coin(1, 1))
            .expect_err("off grid");
        assert!(matches!(err, DropError::OffGrid { .. }));
    }

    #[test]
    fn pickup_round_trip_frees_the_cell() {
        let mut session = test_session();
        let location = cell_center(GridCoordinate::new(2, 3));
        let id = session.drop_item_near(location, coin(3, 2)).expect("drop");
        session.world.apply_pending();

        let pickup = session.try_pickup(location).expect("pickup");
        assert_eq!(pickup, coin(3, 2));
        session.world.apply_pending();
        assert!(session.world.find_entity(id).is_none());
        assert_eq!(session.grid.occupant_at(GridCoordinate::new(2, 3)), None);
        assert!(session.try_pickup(location).is_none());
    }
}
