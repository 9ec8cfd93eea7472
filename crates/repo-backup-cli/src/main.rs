//! repo-backup CLI - multi-storage repository backup and restore.

use clap::{Parser, Subcommand};
use repo_backup::{CommandStrategy, Config, MemoryCatalog, Repositories, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};

#[derive(Parser)]
#[command(name = "repo-backup")]
#[command(about = "Multi-storage repository backup and restore")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON summary to stdout
    #[arg(long)]
    output_json: bool,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Override the global concurrency ceiling
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Override the per-storage concurrency ceiling
    #[arg(long)]
    max_storage_concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every repository to the given path
    Dump {
        /// Destination directory for the backup
        path: PathBuf,
    },

    /// Restore every repository from the given path
    Restore {
        /// Directory holding the backup to restore
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.verbosity);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> repo_backup::Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(n) = cli.max_concurrency {
        config.backup.max_concurrency = n;
    }
    if let Some(n) = cli.max_storage_concurrency {
        config.backup.max_storage_concurrency = n;
    }
    config.validate()?;

    let catalog = MemoryCatalog::load(&config.catalog.inventory)?;
    let strategy = CommandStrategy::from_config(&config.strategy, &config.backup);
    let repositories = Repositories::new(strategy, catalog, config.backup);

    let summary = match cli.command {
        Commands::Dump { path } => repositories.dump(&path).await?,
        Commands::Restore { path } => repositories.restore(&path).await?,
    };

    if cli.output_json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{:?} run {} finished: {} repositories in {:.1}s ({:?} mode)",
        summary.operation,
        summary.run_id,
        summary.repositories_enqueued,
        summary.duration_seconds,
        summary.mode,
    );
}

fn init_logging(verbosity: &str) {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
