mod actions;
pub(crate) mod bootstrap;
mod drops;
mod placement;
mod session;
mod settings;
mod spawners;
mod tools;


use std::process::ExitCode;

use engine::{compile_def_database, resolve_app_paths, run_headless, AppPaths, LoopSummary};
use tracing::{error, info};

use bootstrap::AppWiring;
use session::{Session, SessionError};
use settings::{env_lookup, WorldSettings};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let result = resolve_app_paths()
        .map_err(SessionError::from)
        .and_then(|app_paths| run_with_paths(&app_paths, &app));
    match result {
        Ok(summary) => {
            info!(ticks_run = summary.ticks_run, "run_complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_with_paths(app_paths: &AppPaths, app: &AppWiring) -> Result<LoopSummary, SessionError> {
    info!(
        root = %app_paths.root.display(),
        base_content_dir = %app_paths.base_content_dir.display(),
        mods_dir = %app_paths.mods_dir.display(),
        settings_path = %app_paths.settings_path.display(),
        "startup"
    );
    let mut session = build_session(app_paths, app, env_lookup)?;
    Ok(run_headless(&app.loop_config, &mut session)?)
}

fn build_session<F>(
    app_paths: &AppPaths,
    app: &AppWiring,
    lookup: F,
) -> Result<Session, SessionError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = WorldSettings::load(&app_paths.settings_path)?;
    settings.apply_env_overrides(lookup);

    let defs = compile_def_database(app_paths, &app.content_request)?;
    info!(
        buried_item_count = defs.buried_item_count(),
        placeable_count = defs.placeable_count(),
        "content_loaded"
    );

    Session::new(&settings, defs, app.seed)
}
