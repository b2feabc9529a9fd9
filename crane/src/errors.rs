//! Error types for crane

use thiserror::Error;

/// Main error type for crane
#[derive(Error, Debug)]
pub enum CraneError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    // Commit construction

    #[error("Commit is empty")]
    EmptyCommit,

    #[error("Commit hexsha is mandatory")]
    HexShaMandatory,

    // Version history

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("History query failed: {0}")]
    HistoryError(String),

    // Fleet control

    #[error("Failed to fetch {0}")]
    FetchFailed(String),

    #[error("Failed to decode response: {0}")]
    DecodeFailed(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Upgrade of {service} failed: {message}")]
    UpgradeFailed {
        service: String,
        message: String,
        action_not_available: bool,
    },

    #[error("Finish upgrade of {0} failed")]
    FinishUpgradeFailed(String),

    // Orchestration

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Running in limited mode: {0}")]
    LimitedMode(String),

    #[error("Deploy failed: {0}")]
    DeployFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Announcement error: {0}")]
    AnnounceError(String),
}

impl CraneError {
    /// Whether the platform refused the upgrade because the service is not
    /// in an upgradeable state
    pub fn is_action_not_available(&self) -> bool {
        matches!(
            self,
            CraneError::UpgradeFailed {
                action_not_available: true,
                ..
            }
        )
    }
}
