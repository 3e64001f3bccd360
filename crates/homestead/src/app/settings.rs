use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use engine::grid::{DEFAULT_GRID_WIDTH, DEFAULT_WORLD_SCALE};
use engine::{GridConfig, GridConfigError, GridCoordinate, TerrainType};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::actions::ScheduledAction;

pub(crate) const GRID_WIDTH_ENV_VAR: &str = "HOMESTEAD_GRID_WIDTH";
pub(crate) const WORLD_SCALE_ENV_VAR: &str = "HOMESTEAD_WORLD_SCALE";

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read world settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse world settings {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// World layout loaded from `assets/world.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WorldSettings {
    #[serde(default)]
    pub(crate) grid: GridSettings,
    /// Applied in order, so later regions paint over earlier ones.
    #[serde(default)]
    pub(crate) terrain: Vec<TerrainRegion>,
    #[serde(default)]
    pub(crate) spawners: Vec<SpawnerSettings>,
    #[serde(default)]
    pub(crate) actions: Vec<ScheduledAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct GridSettings {
    pub(crate) width: u32,
    pub(crate) world_scale: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            world_scale: DEFAULT_WORLD_SCALE,
        }
    }
}

impl GridSettings {
    pub(crate) fn to_config(self) -> Result<GridConfig, GridConfigError> {
        GridConfig::new(self.width, self.world_scale)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TerrainRegion {
    pub(crate) start: GridCoordinate,
    /// Exclusive.
    pub(crate) end: GridCoordinate,
    #[serde(default)]
    pub(crate) terrain: Option<TerrainType>,
    #[serde(default)]
    pub(crate) elevation: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnerSettings {
    pub(crate) name: String,
    pub(crate) location: [f32; 3],
    pub(crate) payload: SpawnPayloadSettings,
    #[serde(default)]
    pub(crate) can_adjust: bool,
    #[serde(default)]
    pub(crate) spawn_delay_seconds: f32,
    #[serde(default = "default_true")]
    pub(crate) trigger_on_begin_play: bool,
    #[serde(default = "default_true")]
    pub(crate) destroy_on_spawn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SpawnPayloadSettings {
    Placeable(String),
    SmallActor(String),
    BuriedItem(String),
}

fn default_true() -> bool {
    true
}

impl WorldSettings {
    /// A missing file is not an error; the world falls back to defaults.
    pub(crate) fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "world_settings_missing_using_defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let settings = Self::parse(&raw, path)?;
        info!(
            path = %path.display(),
            terrain_region_count = settings.terrain.len(),
            spawner_count = settings.spawners.len(),
            action_count = settings.actions.len(),
            "world_settings_loaded"
        );
        Ok(settings)
    }

    pub(crate) fn parse(raw: &str, path: &Path) -> Result<Self, SettingsError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            SettingsError::Parse {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })
    }

    pub(crate) fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = parse_override::<u32, _>(&lookup, GRID_WIDTH_ENV_VAR) {
            self.grid.width = width;
        }
        if let Some(world_scale) = parse_override::<f32, _>(&lookup, WORLD_SCALE_ENV_VAR) {
            self.grid.world_scale = world_scale;
        }
    }
}

pub(crate) fn parse_override<T, F>(lookup: &F, env_var: &'static str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(env_var)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            info!(env_var, value = raw.as_str(), "settings_env_override");
            Some(value)
        }
        Err(_) => {
            warn!(
                env_var,
                value = raw.as_str(),
                "invalid env var value; keeping configured value"
            );
            None
        }
    }
}

pub(crate) fn env_lookup(env_var: &str) -> Option<String> {
    match env::var(env_var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var, error = %error, "unable to read env var; ignoring");
            None
        }
    }
}
