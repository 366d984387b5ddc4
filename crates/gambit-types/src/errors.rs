use thiserror::Error;

pub type Result<T, E = GambitError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum GambitError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("matchmaking error: {0}")]
    Matchmaking(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
