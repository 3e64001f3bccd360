use engine::{ContentRequest, LoopConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::settings::{env_lookup, parse_override};

const ENABLED_MODS_ENV_VAR: &str = "HOMESTEAD_ENABLED_MODS";
const MAX_TICKS_ENV_VAR: &str = "HOMESTEAD_MAX_TICKS";
const SEED_ENV_VAR: &str = "HOMESTEAD_SEED";
const REALTIME_ENV_VAR: &str = "HOMESTEAD_REALTIME";

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) content_request: ContentRequest,
    pub(crate) seed: Option<u64>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Homestead Startup ===");
    build_wiring(env_lookup)
}

pub(crate) fn build_wiring<F>(lookup: F) -> AppWiring
where
    F: Fn(&str) -> Option<String>,
{
    let mut loop_config = LoopConfig::default();
    if let Some(max_ticks) = parse_override::<u64, _>(&lookup, MAX_TICKS_ENV_VAR) {
        loop_config.max_ticks = max_ticks;
    }
    if let Some(realtime) = parse_override::<bool, _>(&lookup, REALTIME_ENV_VAR) {
        loop_config.realtime = realtime;
    }

    AppWiring {
        loop_config,
        content_request: ContentRequest {
            enabled_mods: parse_enabled_mods(lookup(ENABLED_MODS_ENV_VAR)),
        },
        seed: parse_override::<u64, _>(&lookup, SEED_ENV_VAR),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_enabled_mods(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    })
    .unwrap_or_default()
}
