//! # repo-backup
//!
//! Concurrency orchestration for backing up and restoring the repository
//! data of a multi-storage deployment: project repositories, wikis, design
//! repositories, and snippet repositories.
//!
//! The library does not move bytes itself. It discovers which containers
//! live on which storage through a [`RepositoryCatalog`], dispatches every
//! owned repository to a [`BackupStrategy`], and enforces two independent
//! concurrency ceilings (a global admission semaphore across all storages
//! and a worker ceiling per storage) with cooperative first-error
//! short-circuiting and a guaranteed clean shutdown of every spawned
//! worker.
//!
//! ## Example
//!
//! ```rust,no_run
//! use repo_backup::{CommandStrategy, Config, MemoryCatalog, Repositories};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> repo_backup::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let catalog = MemoryCatalog::load(&config.catalog.inventory)?;
//!     let strategy = CommandStrategy::from_config(&config.strategy, &config.backup);
//!
//!     let repositories = Repositories::new(strategy, catalog, config.backup);
//!     let summary = repositories.dump(Path::new("/var/backups/repositories")).await?;
//!     println!("backed up {} repositories", summary.repositories_enqueued);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod strategy;

// Re-exports for convenient access
pub use catalog::{Inventory, MemoryCatalog};
pub use config::{BackupConfig, CatalogConfig, Config, StrategyConfig};
pub use core::{
    Container, ObjectPool, PoolState, ProjectContainer, RepositoryCatalog, RepositoryKind,
    SnippetCheck, SnippetContainer,
};
pub use error::{BackupError, Result};
pub use orchestrator::{Repositories, RunMode, RunSummary};
pub use strategy::{BackupStrategy, CommandStrategy, Operation};
