use std::sync::Arc;

use engine::{BuriedItem, DefDatabase, EntityKind, GridCoordinate, PlaceableDef, Vec3};
use tracing::{debug, info, warn};

use super::session::{CellAnchor, GridSpawnRequest, Session, SessionError};
use super::settings::{SpawnPayloadSettings, SpawnerSettings};

#[derive(Debug, Clone)]
pub(crate) enum SpawnPayload {
    Placeable(PlaceableDef),
    /// Arbitrary 1x1 entity.
    SmallActor(String),
    BuriedItem(Arc<BuriedItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SpawnerState {
    Idle,
    /// One countdown per trigger; each fires on its own.
    Armed { timers: Vec<f32> },
    Retired,
}

/// Puts one thing on the grid at a world location, either when the world
/// begins or when triggered.
#[derive(Debug, Clone)]
pub(crate) struct GridSpawner {
    pub(crate) name: String,
    pub(crate) location: Vec3,
    pub(crate) payload: SpawnPayload,
    pub(crate) can_adjust: bool,
    pub(crate) spawn_delay_seconds: f32,
    pub(crate) trigger_on_begin_play: bool,
    pub(crate) destroy_on_spawn: bool,
    pub(crate) state: SpawnerState,
}

impl GridSpawner {
    pub(crate) fn resolve(
        settings: &SpawnerSettings,
        defs: &DefDatabase,
    ) -> Result<Self, SessionError> {
        let payload = match &settings.payload {
            SpawnPayloadSettings::Placeable(def_name) => defs
                .placeable(def_name)
                .cloned()
                .map(SpawnPayload::Placeable)
                .ok_or_else(|| SessionError::UnknownPlaceable {
                    spawner: settings.name.clone(),
                    def_name: def_name.clone(),
                })?,
            SpawnPayloadSettings::SmallActor(name) => SpawnPayload::SmallActor(name.clone()),
            SpawnPayloadSettings::BuriedItem(def_name) => defs
                .buried_item(def_name)
                .map(SpawnPayload::BuriedItem)
                .ok_or_else(|| SessionError::UnknownBuriedItem {
                    spawner: settings.name.clone(),
                    def_name: def_name.clone(),
                })?,
        };
        let [x, y, z] = settings.location;

        Ok(Self {
            name: settings.name.clone(),
            location: Vec3::new(x, y, z),
            payload,
            can_adjust: settings.can_adjust,
            spawn_delay_seconds: settings.spawn_delay_seconds,
            trigger_on_begin_play: settings.trigger_on_begin_play,
            destroy_on_spawn: settings.destroy_on_spawn,
            state: SpawnerState::Idle,
        })
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.state == SpawnerState::Retired
    }
}

impl Session {
    /// Fires the named spawner now, or arms it when it has a delay. Returns
    /// false when no live spawner has that name.
    pub(crate) fn trigger_spawner(&mut self, name: &str) -> bool {
        let mut spawners = std::mem::take(&mut self.spawners);
        let found = match spawners
            .iter_mut()
            .find(|spawner| spawner.name == name && !spawner.is_retired())
        {
            Some(spawner) => {
                let delay = spawner.spawn_delay_seconds;
                if delay > 0.0 {
                    let pending = match &mut spawner.state {
                        SpawnerState::Armed { timers } => {
                            timers.push(delay);
                            timers.len()
                        }
                        state => {
                            *state = SpawnerState::Armed {
                                timers: vec![delay],
                            };
                            1
                        }
                    };
                    debug!(
                        spawner = %spawner.name,
                        delay_seconds = delay,
                        pending,
                        "spawner_armed"
                    );
                } else {
                    self.run_spawner(spawner);
                }
                true
            }
            None => {
                warn!(spawner = name, "spawner_trigger_unknown");
                false
            }
        };
        spawners.retain(|spawner| !spawner.is_retired());
        self.spawners = spawners;
        found
    }

    pub(crate) fn tick_spawners(&mut self, fixed_dt_seconds: f32) {
        let mut spawners = std::mem::take(&mut self.spawners);
        for spawner in &mut spawners {
            let SpawnerState::Armed { timers } = &mut spawner.state else {
                continue;
            };
            let mut due = 0;
            timers.retain_mut(|remaining| {
                *remaining -= fixed_dt_seconds;
                if *remaining > 0.0 {
                    true
                } else {
                    due += 1;
                    false
                }
            });
            if timers.is_empty() {
                spawner.state = SpawnerState::Idle;
            }
            for _ in 0..due {
                self.run_spawner(spawner);
                if spawner.is_retired() {
                    break;
                }
            }
        }
        spawners.retain(|spawner| !spawner.is_retired());
        self.spawners = spawners;
    }

    fn run_spawner(&mut self, spawner: &mut GridSpawner) {
        let Some(desired) = self.grid.grid_position_at(spawner.location) else {
            warn!(spawner = %spawner.name, "spawner_not_on_grid");
            return;
        };

        let spawned = match &spawner.payload {
            SpawnPayload::Placeable(def) => self
                .spawn_on_grid(GridSpawnRequest {
                    debug_name: def.def_name.clone(),
                    kind: EntityKind::Placeable,
                    footprint: def.footprint,
                    desired,
                    allow_adjust: spawner.can_adjust,
                    anchor: CellAnchor::Corner,
                    pickup: None,
                })
                .is_ok(),
            SpawnPayload::SmallActor(actor_name) => self
                .spawn_on_grid(GridSpawnRequest {
                    debug_name: actor_name.clone(),
                    kind: EntityKind::Prop,
                    footprint: GridCoordinate::ONE,
                    desired,
                    allow_adjust: spawner.can_adjust,
                    anchor: CellAnchor::Corner,
                    pickup: None,
                })
                .is_ok(),
            SpawnPayload::BuriedItem(item) => self
                .grid
                .place_buried_item(Some(Arc::clone(item)), desired)
                .is_ok(),
        };

        if !spawned {
            warn!(spawner = %spawner.name, position = %desired, "spawner_failed");
            return;
        }
        info!(spawner = %spawner.name, position = %desired, "spawner_fired");
        if spawner.destroy_on_spawn {
            spawner.state = SpawnerState::Retired;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{session_with, test_defs};

    fn spawner_settings(name: &str, payload: SpawnPayloadSettings) -> SpawnerSettings {
        SpawnerSettings {
            name: name.to_string(),
            location: [150.0, 150.0, 0.0],
            payload,
            can_adjust: true,
            spawn_delay_seconds: 0.0,
            trigger_on_begin_play: false,
            destroy_on_spawn: true,
        }
    }

    #[test]
    fn unknown_defs_fail_resolution() {
        let defs = test_defs();
        let err = GridSpawner::resolve(
            &spawner_settings("x", SpawnPayloadSettings::Placeable("missing".to_string())),
            &defs,
        )
        .expect_err("err");
        assert!(matches!(err, SessionError::UnknownPlaceable { .. }));

        let err = GridSpawner::resolve(
            &spawner_settings("x", SpawnPayloadSettings::BuriedItem("missing".to_string())),
            &defs,
        )
        .expect_err("err");
        assert!(matches!(err, SessionError::UnknownBuriedItem { .. }));
    }

    #[test]
    fn immediate_trigger_spawns_and_retires() {
        let mut session = session_with(vec![spawner_settings(
            "bed",
            SpawnPayloadSettings::Placeable("furniture.bed".to_string()),
        )]);

        assert!(session.trigger_spawner("bed"));
        assert_eq!(session.grid.placed_entity_count(), 1);
        assert_eq!(session.grid.occupied_cell_count(), 4);
        assert!(session.spawners.is_empty());
        assert!(!session.trigger_spawner("bed"));
    }

    #[test]
    fn delayed_trigger_fires_after_countdown() {
        let mut settings =
            spawner_settings("stump", SpawnPayloadSettings::SmallActor("stump".to_string()));
        settings.spawn_delay_seconds = 0.25;
        let mut session = session_with(vec![settings]);

        assert!(session.trigger_spawner("stump"));
        session.tick_spawners(0.1);
        session.tick_spawners(0.1);
        assert_eq!(session.grid.placed_entity_count(), 0);
        session.tick_spawners(0.1);
        assert_eq!(session.grid.placed_entity_count(), 1);
        assert!(session.spawners.is_empty());
    }

    #[test]
    fn retrigger_while_armed_queues_a_second_spawn() {
        let mut settings =
            spawner_settings("stump", SpawnPayloadSettings::SmallActor("stump".to_string()));
        settings.spawn_delay_seconds = 0.25;
        settings.destroy_on_spawn = false;
        let mut session = session_with(vec![settings]);

        assert!(session.trigger_spawner("stump"));
        session.tick_spawners(0.1);
        assert!(session.trigger_spawner("stump"));
        assert!(matches!(
            &session.spawners[0].state,
            SpawnerState::Armed { timers } if timers.len() == 2
        ));

        session.tick_spawners(0.1);
        assert_eq!(session.grid.placed_entity_count(), 0);
        session.tick_spawners(0.1);
        assert_eq!(session.grid.placed_entity_count(), 1);
        assert!(matches!(
            &session.spawners[0].state,
            SpawnerState::Armed { timers } if timers.len() == 1
        ));
        session.tick_spawners(0.1);
        assert_eq!(session.grid.placed_entity_count(), 2);
        assert_eq!(session.spawners[0].state, SpawnerState::Idle);
    }

    #[test]
    fn queued_timers_stop_once_spawner_retires() {
        let mut settings =
            spawner_settings("stump", SpawnPayloadSettings::SmallActor("stump".to_string()));
        settings.spawn_delay_seconds = 0.1;
        let mut session = session_with(vec![settings]);

        assert!(session.trigger_spawner("stump"));
        assert!(session.trigger_spawner("stump"));
        session.tick_spawners(0.5);
        assert_eq!(session.grid.placed_entity_count(), 1);
        assert!(session.spawners.is_empty());
    }

    #[test]
    fn untriggered_spawner_never_fires() {
        let mut settings =
            spawner_settings("stump", SpawnPayloadSettings::SmallActor("stump".to_string()));
        settings.spawn_delay_seconds = 0.1;
        let mut session = session_with(vec![settings]);

        for _ in 0..10 {
            session.tick_spawners(0.1);
        }
        assert_eq!(session.grid.placed_entity_count(), 0);
        assert_eq!(session.spawners.len(), 1);
    }

    #[test]
    fn off_grid_spawner_stays_and_can_retry() {
        let mut settings =
            spawner_settings("lost", SpawnPayloadSettings::SmallActor("lost".to_string()));
        settings.location = [-500.0, 10.0, 0.0];
        let mut session = session_with(vec![settings]);

        assert!(session.trigger_spawner("lost"));
        assert_eq!(session.spawners.len(), 1);
        assert_eq!(session.spawners[0].state, SpawnerState::Idle);
    }

    #[test]
    fn persistent_spawner_keeps_firing_and_buries_items() {
        let mut settings =
            spawner_settings("coin", SpawnPayloadSettings::BuriedItem("dig.coin".to_string()));
        settings.destroy_on_spawn = false;
        let mut session = session_with(vec![settings]);

        assert!(session.trigger_spawner("coin"));
        let position = GridCoordinate::new(1, 1);
        assert!(session.grid.buried_item_at(position).is_some());
        assert!(session.grid.detection_at(position).is_detectable());
        assert!(session.trigger_spawner("coin"));
        assert_eq!(session.spawners.len(), 1);
    }

    #[test]
    fn failed_spawn_keeps_spawner() {
        let mut settings = spawner_settings(
            "bed",
            SpawnPayloadSettings::Placeable("furniture.bed".to_string()),
        );
        settings.can_adjust = false;
        settings.location = [350.0, 350.0, 0.0];
        let mut session = session_with(vec![settings]);

        // A 2x2 at (3,3) runs off the 4-wide test grid.
        assert!(session.trigger_spawner("bed"));
        assert_eq!(session.grid.placed_entity_count(), 0);
        assert_eq!(session.world.entity_count(), 0);
        assert_eq!(session.spawners.len(), 1);
    }
}
