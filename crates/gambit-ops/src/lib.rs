//! Operational helpers: logging setup and on-disk state locations.

use std::path::PathBuf;

use gambit_types::{config::OpsConfig, GambitError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| GambitError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| GambitError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Creates the data directory if needed and returns it.
pub fn ensure_data_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| GambitError::Ops(format!("failed to create data dir: {err}")))?;
    info!("Data directory ready at {:?}", dir);
    Ok(dir)
}

/// Location of the persisted opponent store for `username`.
pub fn matchmaking_file(data_dir: &str, username: &str) -> PathBuf {
    PathBuf::from(data_dir).join(format!("{username}_matchmaking.json"))
}
