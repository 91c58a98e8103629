use crate::consent::config::SyncConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("Cookie jar lock is poisoned")]
    Poisoned,

    #[error("Consent tool is already initialized")]
    AlreadyInitialized,

    #[error("Consent tool is not initialized")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] SyncConfigError),

    #[error("Cookie store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cookie store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),
}
