//! Configuration validation.

use super::Config;
use crate::error::{BackupError, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.backup.max_concurrency < 1 {
        return Err(BackupError::config(
            "backup.max_concurrency must be at least 1",
        ));
    }
    if config.backup.max_storage_concurrency < 1 {
        return Err(BackupError::config(
            "backup.max_storage_concurrency must be at least 1",
        ));
    }

    if config.backup.storages.is_empty() {
        return Err(BackupError::config(
            "backup.storages must name at least one storage",
        ));
    }
    let mut seen = HashSet::new();
    for storage in &config.backup.storages {
        if storage.is_empty() {
            return Err(BackupError::config("backup.storages contains an empty name"));
        }
        if !seen.insert(storage.as_str()) {
            return Err(BackupError::config(format!(
                "backup.storages lists \"{storage}\" more than once"
            )));
        }
    }

    if config.strategy.command.as_os_str().is_empty() {
        return Err(BackupError::config("strategy.command is required"));
    }
    if config.catalog.inventory.as_os_str().is_empty() {
        return Err(BackupError::config("catalog.inventory is required"));
    }

    Ok(())
}
