use engine::{Pickup, Vec3};
use serde::Deserialize;
use tracing::{info, warn};

use super::session::Session;

/// Something a player would do with a tool or an item, fed in headless from
/// the world settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum PlayerAction {
    Dig {
        at: [f32; 3],
    },
    Probe {
        at: [f32; 3],
    },
    /// Marks the last probed cell.
    Mark,
    Drop {
        at: [f32; 3],
        item: String,
        #[serde(default = "default_one")]
        stack_size: u8,
        #[serde(default = "default_one")]
        quality: u8,
    },
    Pickup {
        at: [f32; 3],
    },
    Place {
        def: String,
        origin: [f32; 3],
        facing: [f32; 3],
    },
    Trigger {
        spawner: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScheduledAction {
    /// Runs on the first tick whose number is at least this. Ticks count
    /// from 1.
    pub(crate) at_tick: u64,
    pub(crate) action: PlayerAction,
}

fn default_one() -> u8 {
    1
}

fn vec3([x, y, z]: [f32; 3]) -> Vec3 {
    Vec3::new(x, y, z)
}

impl Session {
    pub(crate) fn run_due_actions(&mut self) {
        while self
            .actions
            .front()
            .is_some_and(|scheduled| scheduled.at_tick <= self.tick)
        {
            if let Some(scheduled) = self.actions.pop_front() {
                self.run_action(&scheduled.action);
            }
        }
    }

    pub(crate) fn run_action(&mut self, action: &PlayerAction) {
        match action {
            PlayerAction::Dig { at } => {
                if let Some(reward) = self.shovel_dig(vec3(*at)) {
                    self.carried.push(reward);
                }
            }
            PlayerAction::Probe { at } => {
                let signal = self.detector_probe(vec3(*at));
                info!(
                    rarity = signal.rarity,
                    distance = signal.distance,
                    detected = signal.is_detectable(),
                    "action_probe"
                );
            }
            PlayerAction::Mark => match self.detector_activate() {
                Ok(Some(_)) => {}
                Ok(None) => warn!("action_mark_without_probe"),
                Err(error) => warn!(error = %error, "action_mark_failed"),
            },
            PlayerAction::Drop {
                at,
                item,
                stack_size,
                quality,
            } => {
                let pickup = Pickup {
                    def_name: item.clone(),
                    stack_size: *stack_size,
                    quality: *quality,
                };
                if let Err(error) = self.drop_item_near(vec3(*at), pickup) {
                    warn!(error = %error, "action_drop_failed");
                }
            }
            PlayerAction::Pickup { at } => match self.try_pickup(vec3(*at)) {
                Some(pickup) => self.carried.push(pickup),
                None => info!("action_pickup_nothing"),
            },
            PlayerAction::Place {
                def,
                origin,
                facing,
            } => {
                if let Err(error) = self.try_place_item(def, vec3(*origin), vec3(*facing)) {
                    warn!(error = %error, "action_place_failed");
                }
            }
            PlayerAction::Trigger { spawner } => {
                self.trigger_spawner(spawner);
            }
        }
    }
}
