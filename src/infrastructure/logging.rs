// Logging setup
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "DASHBOARD_LOG";

fn filter(configured_level: &str) -> EnvFilter {
    filter_from(std::env::var(LOG_ENV).ok().as_deref(), configured_level)
}

/// Directives from the environment win when they parse. Otherwise the
/// configured level is used, and `info` when that does not parse either.
fn filter_from(env_directives: Option<&str>, configured_level: &str) -> EnvFilter {
    env_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber. Call once, at start-up.
pub fn init(configured_level: &str) -> anyhow::Result<()> {
    fmt()
        .with_env_filter(filter(configured_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
