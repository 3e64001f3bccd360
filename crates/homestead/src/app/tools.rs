use engine::{
    BuriedItem, DebugColor, DetectionSignal, EntityId, EntityKind, GridCoordinate, GridError,
    Pickup, Vec3,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use super::session::{CellAnchor, GridSpawnRequest, Session};

const SHOVEL_MARKER_SECONDS: f32 = 2.0;
const DETECTOR_MARKER_SECONDS: f32 = 0.1;

/// Picks one reward with equal weight. `None` when the item has no rewards.
pub(crate) fn actualize<R: Rng + ?Sized>(item: &BuriedItem, rng: &mut R) -> Option<Pickup> {
    item.rewards.choose(rng).cloned()
}

/// Holds the cell the detector last probed so a later activation can mark it.
#[derive(Debug, Default, Clone)]
pub(crate) struct Detector {
    probe_cache: Option<GridCoordinate>,
}

impl Detector {
    pub(crate) fn last_probe(&self) -> Option<GridCoordinate> {
        self.probe_cache
    }
}

impl Session {
    /// Digs at `probe`. A grid marker standing on the cell is cleared first;
    /// any other occupant blocks the dig.
    pub(crate) fn shovel_dig(&mut self, probe: Vec3) -> Option<Pickup> {
        let position = self.grid.grid_position_at(probe)?;

        let mut blocked = false;
        if let Some(occupant) = self.grid.occupant_at(position) {
            let is_marker = self
                .world
                .find_entity(occupant)
                .is_some_and(|entity| entity.kind == EntityKind::GridMarker);
            if is_marker {
                if let Err(error) = self.destroy_grid_entity(occupant) {
                    warn!(position = %position, error = %error, "shovel_marker_remove_failed");
                    blocked = true;
                }
            } else {
                debug!(position = %position, occupant = occupant.0, "shovel_blocked");
                blocked = true;
            }
        }

        let mut reward = None;
        if !blocked {
            match self.grid.remove_buried_item_at(position) {
                Ok(Some(item)) => {
                    reward = actualize(&item, &mut self.rng);
                    info!(
                        position = %position,
                        def_name = %item.def_name,
                        reward = reward.as_ref().map_or("none", |pickup| pickup.def_name.as_str()),
                        "shovel_dug_item"
                    );
                }
                Ok(None) => debug!(position = %position, "shovel_dug_nothing"),
                Err(error) => warn!(position = %position, error = %error, "shovel_dig_failed"),
            }
        }

        let marker = self
            .grid
            .debug_draw_position(position, SHOVEL_MARKER_SECONDS, DebugColor::Red);
        self.world.push_debug_marker(marker);
        reward
    }

    /// Reads the detection signal under `probe` and remembers the cell.
    /// Off-grid probes clear the cache and read as no signal.
    pub(crate) fn detector_probe(&mut self, probe: Vec3) -> DetectionSignal {
        self.detector.probe_cache = None;
        let Some(position) = self.grid.grid_position_at(probe) else {
            return DetectionSignal::NONE;
        };
        self.detector.probe_cache = Some(position);

        let signal = self.grid.detection_at(position);
        if signal.is_detectable() {
            debug!(
                position = %position,
                rarity = signal.rarity,
                distance = signal.distance,
                "detector_signal"
            );
        }
        let marker = self
            .grid
            .debug_draw_position(position, DETECTOR_MARKER_SECONDS, DebugColor::Green);
        self.world.push_debug_marker(marker);
        signal
    }

    /// Drops a marker on the last probed cell, or on the nearest free
    /// neighbour. `Ok(None)` when nothing has been probed.
    pub(crate) fn detector_activate(&mut self) -> Result<Option<EntityId>, GridError> {
        let Some(position) = self.detector.last_probe() else {
            return Ok(None);
        };
        let (id, placement) = self.spawn_on_grid(GridSpawnRequest {
            debug_name: "grid_marker".to_string(),
            kind: EntityKind::GridMarker,
            footprint: GridCoordinate::ONE,
            desired: position,
            allow_adjust: true,
            anchor: CellAnchor::Center,
            pickup: None,
        })?;
        info!(id = id.0, position = %placement.position, "grid_marker_placed");
        Ok(Some(id))
    }
}
