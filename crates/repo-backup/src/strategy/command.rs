//! Strategy backed by an external transfer command.
//!
//! `start` spawns the configured program with the operation, the backup
//! path, and both concurrency ceilings as arguments, then feeds it one JSON
//! line per repository on stdin. The program owns the actual transfer
//! pipeline, which is why [`parallel_enqueue`](super::BackupStrategy::parallel_enqueue)
//! reports `false`: the orchestrator stays sequential and the command fans
//! out on its own.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{BackupConfig, StrategyConfig};
use crate::core::{Container, RepositoryKind};
use crate::error::{BackupError, Result};
use crate::strategy::{BackupStrategy, Operation};

/// One transfer request, written to the command's stdin as a JSON line.
#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    storage: &'a str,
    relative_path: String,
    container_path: &'a str,
    repository: RepositoryKind,
}

struct RunningCommand {
    child: Child,
    stdin: ChildStdin,
}

/// [`BackupStrategy`] that pipes transfer requests to an external program.
pub struct CommandStrategy {
    program: PathBuf,
    args: Vec<String>,
    max_parallel: usize,
    max_parallel_storage: usize,
    running: Mutex<Option<RunningCommand>>,
}

impl CommandStrategy {
    /// Create a strategy invoking `program` with default (1/1) parallelism.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            max_parallel: 1,
            max_parallel_storage: 1,
            running: Mutex::new(None),
        }
    }

    /// Prepend fixed arguments before the operation subcommand.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Forward the configured concurrency ceilings to the command.
    pub fn with_concurrency(mut self, max_parallel: usize, max_parallel_storage: usize) -> Self {
        self.max_parallel = max_parallel;
        self.max_parallel_storage = max_parallel_storage;
        self
    }

    /// Build a strategy from the loaded configuration sections.
    pub fn from_config(strategy: &StrategyConfig, backup: &BackupConfig) -> Self {
        Self::new(&strategy.command)
            .with_args(strategy.args.iter().cloned())
            .with_concurrency(backup.max_concurrency, backup.max_storage_concurrency)
    }
}

#[async_trait]
impl BackupStrategy for CommandStrategy {
    async fn start(&self, operation: Operation, path: &Path) -> Result<()> {
        let mut guard = self.running.lock().await;
        if guard.is_some() {
            return Err(BackupError::strategy("transfer command already started"));
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(operation.as_str())
            .arg("--path")
            .arg(path)
            .arg("--parallel")
            .arg(self.max_parallel.to_string())
            .arg("--parallel-storage")
            .arg(self.max_parallel_storage.to_string())
            .stdin(Stdio::piped());

        info!(
            program = %self.program.display(),
            operation = operation.as_str(),
            "starting transfer command"
        );

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackupError::strategy("transfer command stdin was not captured"))?;

        *guard = Some(RunningCommand { child, stdin });
        Ok(())
    }

    async fn enqueue(&self, container: &Container, kind: RepositoryKind) -> Result<()> {
        let request = TransferRequest {
            storage: container.storage(),
            relative_path: container.repository_path(kind),
            container_path: container.full_path(),
            repository: kind,
        };
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');

        let mut guard = self.running.lock().await;
        let running = guard
            .as_mut()
            .ok_or_else(|| BackupError::strategy("transfer command not started"))?;
        running.stdin.write_all(&line).await?;

        debug!(
            storage = request.storage,
            relative_path = %request.relative_path,
            "queued repository for transfer"
        );
        Ok(())
    }

    fn parallel_enqueue(&self) -> bool {
        // The external command pipelines its own transfers.
        false
    }

    async fn finish(&self) -> Result<()> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        let RunningCommand { mut child, stdin } = running;

        // Closing the pipe signals end of input and lets the command drain.
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(BackupError::strategy(format!(
                "transfer command exited with {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProjectContainer, SnippetContainer};
    use serde_json::Value;

    fn project() -> Container {
        Container::Project(ProjectContainer {
            id: 1,
            full_path: "group/app".into(),
            disk_path: "@hashed/aa/bb/aabb".into(),
            storage: "default".into(),
        })
    }

    fn snippet() -> Container {
        Container::Snippet(SnippetContainer {
            id: 9,
            full_path: "snippets/9".into(),
            disk_path: "@snippets/9".into(),
            storage: "nfs1".into(),
        })
    }

    #[tokio::test]
    async fn test_writes_one_json_line_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("requests.jsonl");
        let strategy = CommandStrategy::new("sh")
            .with_args(["-c".to_string(), format!("cat >> {}", sink.display())])
            .with_concurrency(2, 2);

        strategy
            .start(Operation::Create, dir.path())
            .await
            .unwrap();
        strategy
            .enqueue(&project(), RepositoryKind::Wiki)
            .await
            .unwrap();
        strategy
            .enqueue(&snippet(), RepositoryKind::Snippet)
            .await
            .unwrap();
        strategy.finish().await.unwrap();

        let content = std::fs::read_to_string(&sink).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["storage"], "default");
        assert_eq!(lines[0]["relative_path"], "@hashed/aa/bb/aabb.wiki.git");
        assert_eq!(lines[0]["repository"], "wiki");
        assert_eq!(lines[1]["storage"], "nfs1");
        assert_eq!(lines[1]["relative_path"], "@snippets/9.git");
    }

    #[tokio::test]
    async fn test_enqueue_before_start_is_an_error() {
        let strategy = CommandStrategy::new("sh");
        let err = strategy
            .enqueue(&project(), RepositoryKind::Project)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Strategy(_)));
    }

    #[tokio::test]
    async fn test_start_twice_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = CommandStrategy::new("sh").with_args(["-c", "cat > /dev/null"]);
        strategy
            .start(Operation::Create, dir.path())
            .await
            .unwrap();
        let err = strategy
            .start(Operation::Create, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Strategy(_)));
        strategy.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_without_start_is_a_noop() {
        let strategy = CommandStrategy::new("sh");
        assert!(strategy.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_finish_surfaces_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = CommandStrategy::new("sh").with_args(["-c", "cat > /dev/null; exit 3"]);
        strategy
            .start(Operation::Restore, dir.path())
            .await
            .unwrap();
        let err = strategy.finish().await.unwrap_err();
        assert!(matches!(err, BackupError::Strategy(_)));
    }
}
