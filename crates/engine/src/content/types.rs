use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    /// Mod ids in load order. Later mods override earlier defs by name.
    pub enabled_mods: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ContentDiscoveryError {
    #[error("enabled mod id cannot be empty")]
    EmptyEnabledMod,
    #[error("mod id '{mod_id}' is reserved for base content")]
    ReservedModId { mod_id: String },
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
    #[error("failed to list content of mod '{mod_id}' in {path}: {source}")]
    ReadDir {
        mod_id: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
