//! Error types for the backup library.

use crate::core::RepositoryKind;
use thiserror::Error;

/// Main error type for backup and restore operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration error (invalid ceilings, missing storages, bad YAML values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transfer failed for a single repository of a container
    #[error("Transfer failed for {repository} repository of {container}: {message}")]
    Transfer {
        container: String,
        repository: String,
        message: String,
    },

    /// A storage worker pool failed outside of a normal transfer error
    #[error("Worker pool failed for storage {storage}: {message}")]
    Pool { storage: String, message: String },

    /// Strategy collaborator error (transfer command lifecycle, pipe failures)
    #[error("Strategy error: {0}")]
    Strategy(String),

    /// Catalog (data layer) error while enumerating containers
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO error (file operations, child process pipes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        BackupError::Config(message.into())
    }

    /// Create a Transfer error for one (container, repository kind) job
    pub fn transfer(
        container: impl Into<String>,
        kind: RepositoryKind,
        message: impl ToString,
    ) -> Self {
        BackupError::Transfer {
            container: container.into(),
            repository: kind.as_str().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Pool error with the owning storage name
    pub fn pool(storage: impl Into<String>, message: impl Into<String>) -> Self {
        BackupError::Pool {
            storage: storage.into(),
            message: message.into(),
        }
    }

    /// Create a Strategy error
    pub fn strategy(message: impl Into<String>) -> Self {
        BackupError::Strategy(message.into())
    }

    /// Create a Catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        BackupError::Catalog(message.into())
    }
}

/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
