//! Data-layer trait for enumerating containers and their storage assignment.
//!
//! The orchestrator never talks to a database directly. Everything it needs
//! from persisted state goes through [`RepositoryCatalog`]: which containers
//! exist, which storage each lives on, and the two narrow maintenance writes
//! performed after a restore (clearing an invalid snippet, rescheduling an
//! object pool). Implementations must be safe to call from concurrent
//! producer tasks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::container::{ProjectContainer, SnippetContainer};
use crate::error::Result;

/// Replication state of an object pool repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    None,
    Scheduled,
    #[default]
    Ready,
    Failed,
}

/// An object-pool repository shared by a fork network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPool {
    /// Stable database identifier.
    pub id: i64,

    /// On-storage path of the pool repository.
    pub disk_path: String,

    /// Project the pool was created from; `None` once that project is gone.
    #[serde(default)]
    pub source_project: Option<i64>,

    /// Projects currently borrowing objects from this pool.
    #[serde(default)]
    pub member_projects: Vec<i64>,

    /// Current replication state.
    #[serde(default)]
    pub state: PoolState,
}

/// Outcome of validating a restored snippet repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetCheck {
    pub success: bool,
    pub message: Option<String>,
}

impl SnippetCheck {
    /// The repository passed validation.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// The repository failed validation with the given reason.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Read-mostly view of the persisted repository metadata.
///
/// Enumeration methods return containers in stable database order (by id),
/// so sequential and parallel runs visit the same containers in the same
/// per-storage order.
#[async_trait]
pub trait RepositoryCatalog: Send + Sync {
    /// All projects, in stable id order.
    async fn projects(&self) -> Result<Vec<ProjectContainer>>;

    /// All snippets, in stable id order.
    async fn snippets(&self) -> Result<Vec<SnippetContainer>>;

    /// Projects whose repositories live on the given storage, in id order.
    async fn projects_in_storage(&self, storage: &str) -> Result<Vec<ProjectContainer>>;

    /// Snippets whose repositories live on the given storage, in id order.
    async fn snippets_in_storage(&self, storage: &str) -> Result<Vec<SnippetContainer>>;

    /// Distinct storage names referenced by existing project repositories.
    async fn project_repository_storages(&self) -> Result<Vec<String>>;

    /// Distinct storage names referenced by existing snippet repositories.
    async fn snippet_repository_storages(&self) -> Result<Vec<String>>;

    /// All object pools, with their source/member relationships.
    async fn object_pools(&self) -> Result<Vec<ObjectPool>>;

    /// Reset a pool's state and schedule its replication from the given
    /// source project.
    async fn reschedule_pool(&self, pool_id: i64, source_project: i64) -> Result<()>;

    /// Validate a restored snippet repository.
    async fn check_snippet_repository(&self, snippet: &SnippetContainer) -> Result<SnippetCheck>;

    /// Remove the repository of a snippet that failed validation.
    async fn remove_snippet_repository(&self, snippet_id: i64) -> Result<()>;

    /// Delete the given snippet records in one batch.
    async fn delete_snippets(&self, ids: &[i64]) -> Result<()>;
}

#[async_trait]
impl<T: RepositoryCatalog + ?Sized> RepositoryCatalog for std::sync::Arc<T> {
    async fn projects(&self) -> Result<Vec<ProjectContainer>> {
        (**self).projects().await
    }

    async fn snippets(&self) -> Result<Vec<SnippetContainer>> {
        (**self).snippets().await
    }

    async fn projects_in_storage(&self, storage: &str) -> Result<Vec<ProjectContainer>> {
        (**self).projects_in_storage(storage).await
    }

    async fn snippets_in_storage(&self, storage: &str) -> Result<Vec<SnippetContainer>> {
        (**self).snippets_in_storage(storage).await
    }

    async fn project_repository_storages(&self) -> Result<Vec<String>> {
        (**self).project_repository_storages().await
    }

    async fn snippet_repository_storages(&self) -> Result<Vec<String>> {
        (**self).snippet_repository_storages().await
    }

    async fn object_pools(&self) -> Result<Vec<ObjectPool>> {
        (**self).object_pools().await
    }

    async fn reschedule_pool(&self, pool_id: i64, source_project: i64) -> Result<()> {
        (**self).reschedule_pool(pool_id, source_project).await
    }

    async fn check_snippet_repository(&self, snippet: &SnippetContainer) -> Result<SnippetCheck> {
        (**self).check_snippet_repository(snippet).await
    }

    async fn remove_snippet_repository(&self, snippet_id: i64) -> Result<()> {
        (**self).remove_snippet_repository(snippet_id).await
    }

    async fn delete_snippets(&self, ids: &[i64]) -> Result<()> {
        (**self).delete_snippets(ids).await
    }
}
