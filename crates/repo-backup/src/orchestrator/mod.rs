//! Backup/restore orchestrator.
//!
//! [`Repositories`] is the top-level entry point. `dump` decides between a
//! sequential walk and a parallel fan-out (one task per storage, each
//! running a storage worker pool bounded by the shared global
//! semaphore), joins everything, and re-raises the first error after every
//! pool has drained. `restore` is always sequential and is followed by two
//! maintenance passes over snippets and object pools. The strategy's
//! `finish` runs on every exit path of both operations.

mod pool;
pub mod queue;
pub mod sink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::BackupConfig;
use crate::core::{Container, RepositoryCatalog};
use crate::error::{BackupError, Result};
use crate::orchestrator::pool::StorageWorkerPool;
use crate::orchestrator::sink::ErrorSink;
use crate::strategy::{BackupStrategy, Operation};

/// How a run dispatches its containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sequential,
    Parallel,
}

/// Result of a completed dump or restore run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Operation performed.
    pub operation: Operation,

    /// Backup path the run targeted.
    pub path: PathBuf,

    /// Dispatch mode the run used.
    pub mode: RunMode,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Total repositories handed to the strategy.
    pub repositories_enqueued: u64,
}

impl RunSummary {
    /// Convert to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-invocation state, created when a run starts and consumed into a
/// [`RunSummary`] when it returns.
struct RunState {
    run_id: String,
    operation: Operation,
    path: PathBuf,
    mode: RunMode,
    started_at: DateTime<Utc>,
    enqueued: Arc<AtomicU64>,
}

impl RunState {
    fn new(operation: Operation, path: &Path, mode: RunMode) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            operation,
            path: path.to_path_buf(),
            mode,
            started_at: Utc::now(),
            enqueued: Arc::new(AtomicU64::new(0)),
        }
    }

    fn into_summary(self) -> RunSummary {
        let completed_at = Utc::now();
        let duration_seconds =
            (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        RunSummary {
            run_id: self.run_id,
            operation: self.operation,
            path: self.path,
            mode: self.mode,
            started_at: self.started_at,
            completed_at,
            duration_seconds,
            repositories_enqueued: self.enqueued.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrates backup and restore of every repository across all storages.
pub struct Repositories<S, C> {
    strategy: Arc<S>,
    catalog: Arc<C>,
    config: BackupConfig,
}

impl<S, C> Repositories<S, C>
where
    S: BackupStrategy + 'static,
    C: RepositoryCatalog + 'static,
{
    pub fn new(strategy: S, catalog: C, config: BackupConfig) -> Self {
        Self {
            strategy: Arc::new(strategy),
            catalog: Arc::new(catalog),
            config,
        }
    }

    /// Back up every repository to `path`.
    ///
    /// The strategy's `finish` is awaited on every exit path; a run error
    /// takes precedence over a finish error.
    pub async fn dump(&self, path: &Path) -> Result<RunSummary> {
        let run = self.dump_run(path).await;
        let finish = self.strategy.finish().await;
        match run {
            Ok(summary) => {
                finish?;
                info!(
                    run_id = %summary.run_id,
                    repositories = summary.repositories_enqueued,
                    "dump completed in {:.1}s",
                    summary.duration_seconds
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(finish_err) = finish {
                    warn!("finish failed after run error: {finish_err}");
                }
                Err(err)
            }
        }
    }

    async fn dump_run(&self, path: &Path) -> Result<RunSummary> {
        self.strategy.start(Operation::Create, path).await?;

        let mode = self.select_mode();
        let state = RunState::new(Operation::Create, path, mode);
        info!(
            run_id = %state.run_id,
            mode = ?mode,
            path = %path.display(),
            "starting repository dump"
        );

        match mode {
            RunMode::Sequential => self.enqueue_consecutive(&state.enqueued).await?,
            RunMode::Parallel => self.enqueue_parallel(&state.enqueued).await?,
        }

        Ok(state.into_summary())
    }

    /// Restore every repository from `path`, then clean up snippets whose
    /// restored repository fails validation and reschedule object pools.
    ///
    /// Always sequential: restore ordering constraints make parallel
    /// dispatch unsafe here. `finish` and both maintenance passes run even
    /// when the restore itself failed.
    pub async fn restore(&self, path: &Path) -> Result<RunSummary> {
        let run = self.restore_run(path).await;
        let finish = self.strategy.finish().await;
        let cleanup = self.cleanup_snippets_without_repositories().await;
        let pools = self.restore_object_pools().await;

        match run {
            Ok(summary) => {
                finish?;
                cleanup?;
                pools?;
                info!(
                    run_id = %summary.run_id,
                    repositories = summary.repositories_enqueued,
                    "restore completed in {:.1}s",
                    summary.duration_seconds
                );
                Ok(summary)
            }
            Err(err) => {
                for (label, result) in [
                    ("finish", finish),
                    ("snippet cleanup", cleanup),
                    ("object pool restore", pools),
                ] {
                    if let Err(e) = result {
                        warn!("{label} failed after restore error: {e}");
                    }
                }
                Err(err)
            }
        }
    }

    async fn restore_run(&self, path: &Path) -> Result<RunSummary> {
        self.strategy.start(Operation::Restore, path).await?;

        let state = RunState::new(Operation::Restore, path, RunMode::Sequential);
        info!(
            run_id = %state.run_id,
            path = %path.display(),
            "starting repository restore"
        );

        self.enqueue_consecutive(&state.enqueued).await?;
        Ok(state.into_summary())
    }

    fn select_mode(&self) -> RunMode {
        if self.config.is_sequential() || !self.strategy.parallel_enqueue() {
            RunMode::Sequential
        } else {
            RunMode::Parallel
        }
    }

    /// Sequential path: every project, then every snippet, each repository
    /// enqueued directly with no queues or semaphores.
    async fn enqueue_consecutive(&self, enqueued: &Arc<AtomicU64>) -> Result<()> {
        for project in self.catalog.projects().await? {
            enqueue_container(self.strategy.as_ref(), &Container::Project(project), enqueued)
                .await?;
        }
        for snippet in self.catalog.snippets().await? {
            enqueue_container(self.strategy.as_ref(), &Container::Snippet(snippet), enqueued)
                .await?;
        }
        Ok(())
    }

    /// Parallel path: one storage worker pool per configured storage, all
    /// sharing one admission semaphore sized to the global ceiling.
    async fn enqueue_parallel(&self, enqueued: &Arc<AtomicU64>) -> Result<()> {
        if self.config.max_concurrency < 1 || self.config.max_storage_concurrency < 1 {
            return Err(BackupError::config(
                "max_concurrency and max_storage_concurrency must be at least 1",
            ));
        }
        self.check_valid_storages().await?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let errors = ErrorSink::new();

        let tasks: Vec<_> = self
            .config
            .storages
            .iter()
            .map(|storage| {
                let pool = StorageWorkerPool::new(
                    storage.clone(),
                    self.config.max_storage_concurrency,
                    semaphore.clone(),
                    self.strategy.clone(),
                    self.catalog.clone(),
                    enqueued.clone(),
                );
                (storage.clone(), tokio::spawn(pool.run()))
            })
            .collect();

        // Join in storage iteration order, so the error the caller sees is
        // deterministic across runs with the same failure.
        for (storage, task) in tasks {
            match task.await {
                Ok(Ok(())) => debug!(storage = %storage, "storage completed"),
                Ok(Err(err)) => errors.record(err),
                Err(join_err) => errors.record(BackupError::pool(
                    &storage,
                    format!("storage task panicked: {join_err}"),
                )),
            }
        }

        match errors.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Removing a storage from configuration while repository records still
    /// reference it would silently corrupt future backups; fail fast
    /// instead.
    async fn check_valid_storages(&self) -> Result<()> {
        for (kind, referenced) in [
            ("project", self.catalog.project_repository_storages().await?),
            ("snippet", self.catalog.snippet_repository_storages().await?),
        ] {
            for storage in referenced {
                if !self.config.storages.contains(&storage) {
                    return Err(BackupError::config(format!(
                        "configured storages do not include \"{storage}\", \
                         which is still used by {kind} repositories"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Snippets whose restored repository fails validation failed to import
    /// and are removed along with their repository.
    async fn cleanup_snippets_without_repositories(&self) -> Result<()> {
        let mut invalid = Vec::new();
        for snippet in self.catalog.snippets().await? {
            let check = self.catalog.check_snippet_repository(&snippet).await?;
            if check.success {
                continue;
            }
            self.catalog.remove_snippet_repository(snippet.id).await?;
            warn!(
                snippet = %snippet.full_path,
                "snippet cannot be restored: {}",
                check.message.as_deref().unwrap_or("repository failed validation")
            );
            invalid.push(snippet.id);
        }
        if !invalid.is_empty() {
            self.catalog.delete_snippets(&invalid).await?;
        }
        Ok(())
    }

    /// Reschedule every object pool, repointing pools whose source project
    /// is gone to a remaining member. Pools with no source and no members
    /// are skipped with a warning.
    async fn restore_object_pools(&self) -> Result<()> {
        for pool in self.catalog.object_pools().await? {
            info!(pool = %pool.disk_path, "restoring object pool");

            let source = pool
                .source_project
                .or_else(|| pool.member_projects.first().copied());
            let Some(source) = source else {
                warn!(
                    pool = %pool.disk_path,
                    "object pool has no source project and no members, skipping"
                );
                continue;
            };

            self.catalog.reschedule_pool(pool.id, source).await?;
        }
        Ok(())
    }
}

/// Enqueue every repository kind a container owns, directly.
async fn enqueue_container<S: BackupStrategy>(
    strategy: &S,
    container: &Container,
    enqueued: &AtomicU64,
) -> Result<()> {
    for &kind in container.repository_kinds() {
        strategy
            .enqueue(container, kind)
            .await
            .map_err(|e| BackupError::transfer(container.full_path(), kind, e))?;
        enqueued.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}
