use std::collections::VecDeque;

use engine::{
    ContentCompileError, DefDatabase, EntityId, EntityKind, EntityWorld, GridConfigError,
    GridCoordinate, GridError, LoopCommand, LoopError, Pickup, Placement, Simulation,
    StartupError, Transform, WorldGrid,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::actions::ScheduledAction;
use super::settings::{SettingsError, WorldSettings};
use super::spawners::GridSpawner;
use super::tools::Detector;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to compile content: {0}")]
    Content(#[from] ContentCompileError),
    #[error("invalid grid settings: {0}")]
    GridConfig(#[from] GridConfigError),
    #[error("terrain region {index} could not be applied: {source}")]
    TerrainRegion {
        index: usize,
        #[source]
        source: GridError,
    },
    #[error("spawner '{spawner}' references unknown placeable def '{def_name}'")]
    UnknownPlaceable { spawner: String, def_name: String },
    #[error("spawner '{spawner}' references unknown buried item def '{def_name}'")]
    UnknownBuriedItem { spawner: String, def_name: String },
    #[error(transparent)]
    Loop(#[from] LoopError),
}

/// Where a grid-spawned entity stands inside its origin cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellAnchor {
    Corner,
    Center,
}

#[derive(Debug, Clone)]
pub(crate) struct GridSpawnRequest {
    pub(crate) debug_name: String,
    pub(crate) kind: EntityKind,
    pub(crate) footprint: GridCoordinate,
    pub(crate) desired: GridCoordinate,
    pub(crate) allow_adjust: bool,
    pub(crate) anchor: CellAnchor,
    pub(crate) pickup: Option<Pickup>,
}

/// One running world: the grid, the entities standing on it, and the
/// requestors that act on both.
pub(crate) struct Session {
    pub(crate) grid: WorldGrid,
    pub(crate) world: EntityWorld,
    pub(crate) defs: DefDatabase,
    pub(crate) spawners: Vec<GridSpawner>,
    pub(crate) detector: Detector,
    pub(crate) rng: StdRng,
    pub(crate) drop_count: u32,
    pub(crate) elapsed_seconds: f32,
    /// Fixed ticks run so far.
    pub(crate) tick: u64,
    /// Pending scripted actions, ordered by tick.
    pub(crate) actions: VecDeque<ScheduledAction>,
    /// Pickups the player has dug up or picked up.
    pub(crate) carried: Vec<Pickup>,
}

impl Session {
    pub(crate) fn new(
        settings: &WorldSettings,
        defs: DefDatabase,
        seed: Option<u64>,
    ) -> Result<Self, SessionError> {
        let mut grid = WorldGrid::new(settings.grid.to_config()?);

        for (index, region) in settings.terrain.iter().enumerate() {
            if let Some(terrain) = region.terrain {
                grid.set_terrain_in_rect(region.start, region.end, terrain)
                    .map_err(|source| SessionError::TerrainRegion { index, source })?;
            }
            if let Some(elevation) = region.elevation {
                grid.set_elevation_in_rect(region.start, region.end, elevation)
                    .map_err(|source| SessionError::TerrainRegion { index, source })?;
            }
        }

        let spawners = settings
            .spawners
            .iter()
            .map(|spawner| GridSpawner::resolve(spawner, &defs))
            .collect::<Result<Vec<_>, _>>()?;

        let mut actions = settings.actions.clone();
        actions.sort_by_key(|scheduled| scheduled.at_tick);

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            terrain_region_count = settings.terrain.len(),
            spawner_count = spawners.len(),
            action_count = actions.len(),
            seeded = seed.is_some(),
            "session_created"
        );

        Ok(Self {
            grid,
            world: EntityWorld::default(),
            defs,
            spawners,
            detector: Detector::default(),
            rng,
            drop_count: 0,
            elapsed_seconds: 0.0,
            tick: 0,
            actions: actions.into(),
            carried: Vec::new(),
        })
    }

    /// Spawns an entity and places it on the grid before it goes live. The
    /// entity is despawned again if placement fails.
    pub(crate) fn spawn_on_grid(
        &mut self,
        request: GridSpawnRequest,
    ) -> Result<(EntityId, Placement), GridError> {
        let entity = self.world.spawn_deferred(
            Transform::default(),
            request.debug_name,
            request.kind,
            request.footprint,
        );
        entity.pickup = request.pickup;
        let id = entity.id;

        match self
            .grid
            .try_place_entity(entity, request.desired, request.allow_adjust)
        {
            Ok(placement) => {
                entity.transform.position = match request.anchor {
                    CellAnchor::Corner => self.grid.grid_to_world_corner(placement.position),
                    CellAnchor::Center => self.grid.grid_to_world_center(placement.position),
                };
                debug!(
                    id = id.0,
                    kind = ?request.kind,
                    position = %placement.position,
                    adjusted = placement.adjusted,
                    "grid_spawn_placed"
                );
                Ok((id, placement))
            }
            Err(error) => {
                warn!(
                    id = id.0,
                    kind = ?request.kind,
                    desired = %request.desired,
                    error = %error,
                    "grid_spawn_failed_destroying"
                );
                self.world.despawn(id);
                Err(error)
            }
        }
    }

    /// Takes an entity off the grid and queues its despawn.
    pub(crate) fn destroy_grid_entity(&mut self, id: EntityId) -> Result<(), GridError> {
        match self.world.find_entity_mut(id) {
            Some(entity) => {
                self.grid.remove_entity(entity)?;
            }
            None => {
                self.grid.remove_entity_by_handle(id)?;
            }
        }
        self.world.despawn(id);
        Ok(())
    }
}

impl Simulation for Session {
    fn begin(&mut self) {
        let spawner_names = self
            .spawners
            .iter()
            .filter(|spawner| spawner.trigger_on_begin_play)
            .map(|spawner| spawner.name.clone())
            .collect::<Vec<_>>();
        for name in spawner_names {
            self.trigger_spawner(&name);
        }
        self.world.apply_pending();
        info!(
            entity_count = self.world.entity_count(),
            placed_entity_count = self.grid.placed_entity_count(),
            "session_begin"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32) -> LoopCommand {
        self.elapsed_seconds += fixed_dt_seconds;
        self.tick += 1;
        self.run_due_actions();
        self.tick_spawners(fixed_dt_seconds);
        self.world.tick_debug_markers(fixed_dt_seconds);
        self.world.apply_pending();
        LoopCommand::Continue
    }

    fn end(&mut self) {
        info!(
            elapsed_seconds = self.elapsed_seconds,
            entity_count = self.world.entity_count(),
            placed_entity_count = self.grid.placed_entity_count(),
            occupied_cell_count = self.grid.occupied_cell_count(),
            pending_spawner_count = self.spawners.len(),
            drop_count = self.drop_count,
            carried_count = self.carried.len(),
            unrun_action_count = self.actions.len(),
            "session_end"
        );
    }
}
