//! Per-storage worker pool.
//!
//! One pool fully processes one storage's containers: a producer enumerates
//! projects then snippets in stable database order onto a capacity-1 queue,
//! and W workers drain it, each acquiring the shared global semaphore
//! around every (container, kind) transfer. Error handling is cooperative:
//! the first failure is recorded in the pool's sink, the producer stops
//! admitting new containers, and the other workers stop at their next
//! pop-check while in-flight items drain to completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::core::{Container, RepositoryCatalog};
use crate::error::{BackupError, Result};
use crate::orchestrator::queue::BoundedQueue;
use crate::orchestrator::sink::ErrorSink;
use crate::strategy::BackupStrategy;

pub(crate) struct StorageWorkerPool<S, C> {
    storage: String,
    workers: usize,
    semaphore: Arc<Semaphore>,
    strategy: Arc<S>,
    catalog: Arc<C>,
    enqueued: Arc<AtomicU64>,
}

impl<S, C> StorageWorkerPool<S, C>
where
    S: BackupStrategy + 'static,
    C: RepositoryCatalog + 'static,
{
    pub fn new(
        storage: String,
        workers: usize,
        semaphore: Arc<Semaphore>,
        strategy: Arc<S>,
        catalog: Arc<C>,
        enqueued: Arc<AtomicU64>,
    ) -> Self {
        Self {
            storage,
            workers,
            semaphore,
            strategy,
            catalog,
            enqueued,
        }
    }

    /// Process every container on this storage. On success, every owned
    /// repository kind of every container has been enqueued exactly once.
    pub async fn run(self) -> Result<()> {
        debug!(
            storage = %self.storage,
            workers = self.workers,
            "starting storage worker pool"
        );

        let queue = BoundedQueue::new(1);
        let errors = Arc::new(ErrorSink::new());

        let handles: Vec<_> = (0..self.workers)
            .map(|_| {
                tokio::spawn(Self::worker(
                    queue.clone(),
                    errors.clone(),
                    self.semaphore.clone(),
                    self.strategy.clone(),
                    self.enqueued.clone(),
                ))
            })
            .collect();

        let produced = self.enqueue_containers(&queue, &errors).await;

        // Closing wakes every worker blocked on pop, whatever the outcome
        // of enumeration.
        queue.close();
        for result in futures::future::join_all(handles).await {
            if let Err(join_err) = result {
                errors.record(BackupError::pool(
                    &self.storage,
                    format!("worker task panicked: {join_err}"),
                ));
            }
        }

        produced?;
        if let Some(err) = errors.take() {
            return Err(err);
        }

        debug!(storage = %self.storage, "storage worker pool drained");
        Ok(())
    }

    /// Producer: push this storage's containers in database order,
    /// stopping as soon as any worker records an error.
    async fn enqueue_containers(
        &self,
        queue: &BoundedQueue<Container>,
        errors: &ErrorSink,
    ) -> Result<()> {
        for project in self.catalog.projects_in_storage(&self.storage).await? {
            if errors.has_error() {
                return Ok(());
            }
            if !queue.push(Container::Project(project)).await {
                return Ok(());
            }
        }
        for snippet in self.catalog.snippets_in_storage(&self.storage).await? {
            if errors.has_error() {
                return Ok(());
            }
            if !queue.push(Container::Snippet(snippet)).await {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn worker(
        queue: BoundedQueue<Container>,
        errors: Arc<ErrorSink>,
        semaphore: Arc<Semaphore>,
        strategy: Arc<S>,
        enqueued: Arc<AtomicU64>,
    ) {
        loop {
            // The check sits before the pop, so a popped container is
            // always carried through to completion.
            if errors.has_error() {
                break;
            }
            let Some(container) = queue.pop().await else {
                break;
            };
            if let Err(err) = Self::process(&container, &semaphore, &strategy, &enqueued).await {
                errors.record(err);
                break;
            }
        }
        // A worker that stops early must also close the queue: the
        // producer may be blocked in push with no one left to pop, and a
        // closed queue is what tells it to stop admitting containers.
        queue.close();
    }

    /// Enqueue every repository kind the container owns, gating each one
    /// with the global admission semaphore.
    async fn process(
        container: &Container,
        semaphore: &Arc<Semaphore>,
        strategy: &S,
        enqueued: &AtomicU64,
    ) -> Result<()> {
        for &kind in container.repository_kinds() {
            // The semaphore is never closed, so acquisition cannot fail.
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let result = strategy.enqueue(container, kind).await;
            drop(permit);
            result.map_err(|e| BackupError::transfer(container.full_path(), kind, e))?;
            enqueued.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
