use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketPulseError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Collaborator contract violation: {0}")]
    Contract(String),

    #[error("Source failure: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Run lock conflict: another pipeline run is in progress")]
    RunLockConflict,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
