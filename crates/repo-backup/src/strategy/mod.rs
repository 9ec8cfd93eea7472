//! Transfer strategy trait.
//!
//! The orchestrator delegates all byte-level work to a strategy: one
//! [`start`](BackupStrategy::start) call brackets the run, one
//! [`enqueue`](BackupStrategy::enqueue) call per (container, kind) job
//! performs or schedules the transfer, and one
//! [`finish`](BackupStrategy::finish) call flushes the run on every exit
//! path.

mod command;

pub use command::CommandStrategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{Container, RepositoryKind};
use crate::error::Result;

/// Which direction a run moves repository data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Restore,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Restore => "restore",
        }
    }
}

/// Performs the actual repository transfers for one backup or restore run.
///
/// `enqueue` must be safe to call concurrently from multiple worker tasks
/// for different containers. `finish` is invoked exactly once per run, on
/// every exit path, including after an error.
#[async_trait]
pub trait BackupStrategy: Send + Sync {
    /// Prepare the destination (or source) at `path` for the run.
    /// Called at most once per run.
    async fn start(&self, operation: Operation, path: &Path) -> Result<()>;

    /// Transfer (or schedule the transfer of) one repository.
    async fn enqueue(&self, container: &Container, kind: RepositoryKind) -> Result<()>;

    /// Whether `enqueue` may be called from concurrent workers. When false,
    /// the orchestrator forces sequential mode regardless of configured
    /// ceilings.
    fn parallel_enqueue(&self) -> bool {
        true
    }

    /// Flush and finalize the run.
    async fn finish(&self) -> Result<()>;
}

#[async_trait]
impl<T: BackupStrategy + ?Sized> BackupStrategy for std::sync::Arc<T> {
    async fn start(&self, operation: Operation, path: &Path) -> Result<()> {
        (**self).start(operation, path).await
    }

    async fn enqueue(&self, container: &Container, kind: RepositoryKind) -> Result<()> {
        (**self).enqueue(container, kind).await
    }

    fn parallel_enqueue(&self) -> bool {
        (**self).parallel_enqueue()
    }

    async fn finish(&self) -> Result<()> {
        (**self).finish().await
    }
}
