//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Concurrency ceilings and the active storage set.
    pub backup: BackupConfig,

    /// External transfer command configuration.
    pub strategy: StrategyConfig,

    /// Data-layer configuration.
    pub catalog: CatalogConfig,
}

/// Concurrency ceilings and the set of configured storages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Ceiling on in-flight transfers across all storages (default: 1).
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,

    /// Ceiling on concurrently-executing workers per storage (default: 1).
    #[serde(default = "default_concurrency")]
    pub max_storage_concurrency: usize,

    /// Names of the active storage backends. Read once at the start of a
    /// run; the set is fixed for the run's duration.
    pub storages: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            max_storage_concurrency: 1,
            storages: vec!["default".to_string()],
        }
    }
}

impl BackupConfig {
    /// Both ceilings are at the sequential floor.
    pub fn is_sequential(&self) -> bool {
        self.max_concurrency <= 1 && self.max_storage_concurrency <= 1
    }
}

/// External transfer command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Program performing the actual repository transfers.
    pub command: PathBuf,

    /// Fixed arguments prepended before the operation subcommand.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Data-layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the YAML inventory describing projects, snippets, and pools.
    pub inventory: PathBuf,
}

fn default_concurrency() -> usize {
    1
}
