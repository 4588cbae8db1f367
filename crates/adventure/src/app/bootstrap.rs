use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::RunConfig;
use super::scenario::{self, Scenario};

const SCENARIO_ENV_VAR: &str = "ADVENTURE_SCENARIO";
const TICKS_ENV_VAR: &str = "ADVENTURE_TICKS";

pub(crate) struct AppWiring {
    pub(crate) scenario: Scenario,
    pub(crate) config: RunConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Adventure Headless Startup ===");

    let scenario = match scenario_path_from_env() {
        Some(path) => scenario::load_scenario(&path)?,
        None => {
            info!(env_var = SCENARIO_ENV_VAR, "builtin_demo_scenario_selected");
            scenario::demo_scenario()
        }
    };

    let mut config = scenario.run.clone();
    if let Some(ticks) = parse_ticks_override(std::env::var(TICKS_ENV_VAR).ok().as_deref())? {
        config.ticks = ticks;
    }
    info!(
        scenario = %scenario.name,
        ticks = config.ticks,
        ticks_per_second = config.ticks_per_second,
        stall_ticks = config.stall_ticks.len(),
        "run_configured"
    );

    Ok(AppWiring { scenario, config })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn scenario_path_from_env() -> Option<PathBuf> {
    std::env::var_os(SCENARIO_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_ticks_override(raw: Option<&str>) -> Result<Option<u64>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(Some)
        .map_err(|error| format!("parse {TICKS_ENV_VAR} '{raw}': {error}"))
}
