//! In-memory repository catalog over a serde-loadable inventory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{
    ObjectPool, PoolState, ProjectContainer, RepositoryCatalog, SnippetCheck, SnippetContainer,
};
use crate::error::Result;

/// Serializable snapshot of the repository metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub projects: Vec<ProjectContainer>,

    #[serde(default)]
    pub snippets: Vec<SnippetContainer>,

    #[serde(default)]
    pub object_pools: Vec<ObjectPool>,

    /// Ids of snippets whose restored repository fails validation.
    #[serde(default)]
    pub invalid_snippets: Vec<i64>,
}

/// [`RepositoryCatalog`] backed by an [`Inventory`] held in memory.
///
/// Maintenance writes mutate the inventory and are additionally recorded so
/// callers can observe what a restore changed.
pub struct MemoryCatalog {
    inventory: RwLock<Inventory>,
    removed_repositories: Mutex<Vec<i64>>,
    rescheduled_pools: Mutex<Vec<(i64, i64)>>,
}

impl MemoryCatalog {
    /// Build a catalog from an inventory, sorting containers into stable
    /// id order.
    pub fn new(mut inventory: Inventory) -> Self {
        inventory.projects.sort_by_key(|p| p.id);
        inventory.snippets.sort_by_key(|s| s.id);
        inventory.object_pools.sort_by_key(|p| p.id);
        Self {
            inventory: RwLock::new(inventory),
            removed_repositories: Mutex::new(Vec::new()),
            rescheduled_pools: Mutex::new(Vec::new()),
        }
    }

    /// Load an inventory from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse an inventory from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let inventory: Inventory = serde_yaml::from_str(yaml)?;
        Ok(Self::new(inventory))
    }

    /// Ids of the snippets currently present.
    pub fn snippet_ids(&self) -> Vec<i64> {
        self.read().snippets.iter().map(|s| s.id).collect()
    }

    /// Current state of the object pools.
    pub fn pools(&self) -> Vec<ObjectPool> {
        self.read().object_pools.clone()
    }

    /// Snippet ids whose repository was removed during restore cleanup.
    pub fn removed_repositories(&self) -> Vec<i64> {
        self.lock(&self.removed_repositories).clone()
    }

    /// (pool id, source project) pairs rescheduled during restore.
    pub fn rescheduled_pools(&self) -> Vec<(i64, i64)> {
        self.lock(&self.rescheduled_pools).clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inventory> {
        self.inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inventory> {
        self.inventory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RepositoryCatalog for MemoryCatalog {
    async fn projects(&self) -> Result<Vec<ProjectContainer>> {
        Ok(self.read().projects.clone())
    }

    async fn snippets(&self) -> Result<Vec<SnippetContainer>> {
        Ok(self.read().snippets.clone())
    }

    async fn projects_in_storage(&self, storage: &str) -> Result<Vec<ProjectContainer>> {
        Ok(self
            .read()
            .projects
            .iter()
            .filter(|p| p.storage == storage)
            .cloned()
            .collect())
    }

    async fn snippets_in_storage(&self, storage: &str) -> Result<Vec<SnippetContainer>> {
        Ok(self
            .read()
            .snippets
            .iter()
            .filter(|s| s.storage == storage)
            .cloned()
            .collect())
    }

    async fn project_repository_storages(&self) -> Result<Vec<String>> {
        let storages: BTreeSet<String> = self
            .read()
            .projects
            .iter()
            .map(|p| p.storage.clone())
            .collect();
        Ok(storages.into_iter().collect())
    }

    async fn snippet_repository_storages(&self) -> Result<Vec<String>> {
        let storages: BTreeSet<String> = self
            .read()
            .snippets
            .iter()
            .map(|s| s.storage.clone())
            .collect();
        Ok(storages.into_iter().collect())
    }

    async fn object_pools(&self) -> Result<Vec<ObjectPool>> {
        Ok(self.read().object_pools.clone())
    }

    async fn reschedule_pool(&self, pool_id: i64, source_project: i64) -> Result<()> {
        let mut inventory = self.write();
        if let Some(pool) = inventory.object_pools.iter_mut().find(|p| p.id == pool_id) {
            pool.source_project = Some(source_project);
            pool.state = PoolState::Scheduled;
        }
        drop(inventory);
        self.lock(&self.rescheduled_pools)
            .push((pool_id, source_project));
        Ok(())
    }

    async fn check_snippet_repository(&self, snippet: &SnippetContainer) -> Result<SnippetCheck> {
        if self.read().invalid_snippets.contains(&snippet.id) {
            Ok(SnippetCheck::error("repository failed validation"))
        } else {
            Ok(SnippetCheck::ok())
        }
    }

    async fn remove_snippet_repository(&self, snippet_id: i64) -> Result<()> {
        self.lock(&self.removed_repositories).push(snippet_id);
        Ok(())
    }

    async fn delete_snippets(&self, ids: &[i64]) -> Result<()> {
        let doomed: HashSet<i64> = ids.iter().copied().collect();
        let mut inventory = self.write();
        inventory.snippets.retain(|s| !doomed.contains(&s.id));
        inventory.invalid_snippets.retain(|id| !doomed.contains(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: i64, storage: &str) -> ProjectContainer {
        ProjectContainer {
            id,
            full_path: format!("group/project-{id}"),
            disk_path: format!("@hashed/{id}"),
            storage: storage.to_string(),
        }
    }

    fn snippet(id: i64, storage: &str) -> SnippetContainer {
        SnippetContainer {
            id,
            full_path: format!("snippets/{id}"),
            disk_path: format!("@snippets/{id}"),
            storage: storage.to_string(),
        }
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(Inventory {
            projects: vec![project(3, "nfs1"), project(1, "default"), project(2, "default")],
            snippets: vec![snippet(11, "default"), snippet(10, "nfs1")],
            object_pools: vec![ObjectPool {
                id: 1,
                disk_path: "@pools/aa".into(),
                source_project: None,
                member_projects: vec![2, 3],
                state: PoolState::Ready,
            }],
            invalid_snippets: vec![10],
        })
    }

    #[tokio::test]
    async fn test_projects_are_sorted_by_id() {
        let ids: Vec<i64> = catalog()
            .projects()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_storage_filtering() {
        let catalog = catalog();
        let default: Vec<i64> = catalog
            .projects_in_storage("default")
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(default, vec![1, 2]);
        assert!(catalog
            .projects_in_storage("missing")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_referenced_storages_are_distinct() {
        let catalog = catalog();
        assert_eq!(
            catalog.project_repository_storages().await.unwrap(),
            vec!["default".to_string(), "nfs1".to_string()]
        );
        assert_eq!(
            catalog.snippet_repository_storages().await.unwrap(),
            vec!["default".to_string(), "nfs1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_snippet_validation_and_cleanup() {
        let catalog = catalog();
        let bad = snippet(10, "nfs1");
        let check = catalog.check_snippet_repository(&bad).await.unwrap();
        assert!(!check.success);

        catalog.remove_snippet_repository(10).await.unwrap();
        catalog.delete_snippets(&[10]).await.unwrap();

        assert_eq!(catalog.snippet_ids(), vec![11]);
        assert_eq!(catalog.removed_repositories(), vec![10]);
    }

    #[tokio::test]
    async fn test_reschedule_pool_resets_state_and_source() {
        let catalog = catalog();
        catalog.reschedule_pool(1, 2).await.unwrap();

        let pools = catalog.pools();
        assert_eq!(pools[0].source_project, Some(2));
        assert_eq!(pools[0].state, PoolState::Scheduled);
        assert_eq!(catalog.rescheduled_pools(), vec![(1, 2)]);
    }

    #[test]
    fn test_inventory_from_yaml() {
        let yaml = "\
projects:
  - id: 1
    full_path: g/p
    disk_path: g/p
    storage: default
object_pools:
  - id: 4
    disk_path: '@pools/bb'
";
        let catalog = MemoryCatalog::from_yaml(yaml).unwrap();
        let pools = catalog.pools();
        assert_eq!(pools[0].id, 4);
        assert_eq!(pools[0].state, PoolState::Ready);
        assert!(pools[0].member_projects.is_empty());
    }
}
