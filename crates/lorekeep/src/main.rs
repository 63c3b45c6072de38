// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lorekeep - privacy-sanitized conversation capture with background
//! auditing and learning extraction.
//!
//! This is the binary entry point for the `lorekeep` CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod jobs;
mod status;
mod worker;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use clap::{Parser, Subcommand};
use lorekeep_config::model::LorekeepConfig;
use lorekeep_core::{LorekeepError, StorageAdapter};
use lorekeep_sanitize::{RedactingWriter, SecretValues};
use lorekeep_storage::SqliteStorage;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Lorekeep - capture conversations, audit them, keep what was learned.
#[derive(Parser, Debug)]
#[command(name = "lorekeep", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Store one captured turn read as JSON from stdin. Never fails.
    Capture,
    /// Run background workers until SIGINT or SIGTERM.
    Worker {
        #[arg(value_enum, default_value_t = worker::WorkerRole::All)]
        role: worker::WorkerRole,
    },
    /// Show queue and store counts.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect and repair the job queue.
    Jobs {
        #[command(subcommand)]
        action: jobs::JobsCommand,
    },
    /// Raise a job by hand.
    Enqueue {
        #[command(subcommand)]
        action: jobs::EnqueueCommand,
    },
    /// Check configuration and database health.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => lorekeep_config::load_and_validate_path(path),
        None => lorekeep_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) if matches!(cli.command, Commands::Capture) => {
            skip_capture(&errors).await;
            return;
        }
        Err(errors) => {
            lorekeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &LorekeepConfig) -> Result<(), LorekeepError> {
    match command {
        Commands::Capture => {
            run_capture(config).await;
            Ok(())
        }
        Commands::Worker { role } => worker::run_worker(config, role).await,
        Commands::Status { json, plain } => status::run_status(config, json, plain).await,
        Commands::Jobs { action } => jobs::run_jobs(config, action).await,
        Commands::Enqueue { action } => jobs::run_enqueue(config, action).await,
        Commands::Doctor { plain } => doctor::run_doctor(config, plain).await,
    }
}

/// Read one event from stdin and ingest it.
///
/// The producer invoking this must never see a failure, so every problem
/// is logged and the process still exits 0.
async fn run_capture(config: &LorekeepConfig) {
    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        warn!(error = %e, "failed to read capture input");
        return;
    }

    let storage = match open_storage(config).await {
        Ok(storage) => storage,
        Err(e) => {
            warn!(error = %e, "capture failed");
            return;
        }
    };

    lorekeep_ingest::capture_line(storage.as_ref(), &input, config.queue.max_attempts).await;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to close storage after capture");
    }
}

/// Capture with an unusable configuration: there is no trustworthy store to
/// write to, so the event is dropped. The errors are logged, stdin is drained
/// so the producer's write never hits a closed pipe, and the process exits 0.
async fn skip_capture(errors: &[lorekeep_config::ConfigError]) {
    init_tracing(&LorekeepConfig::default());
    for error in errors {
        warn!(error = %error, "invalid configuration, capture skipped");
    }
    if let Err(e) = tokio::io::copy(&mut tokio::io::stdin(), &mut tokio::io::sink()).await {
        warn!(error = %e, "failed to drain capture input");
    }
}

/// Open and migrate the configured store.
pub(crate) async fn open_storage(
    config: &LorekeepConfig,
) -> Result<Arc<SqliteStorage>, LorekeepError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Initializes the tracing subscriber, writing redacted lines to stderr.
fn init_tracing(config: &LorekeepConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lorekeep={},warn", config.log.level)));

    let secrets: SecretValues = Arc::new(RwLock::new(Vec::new()));
    for value in [
        config.anthropic.api_key.clone(),
        std::env::var("ANTHROPIC_API_KEY").ok(),
        config.storage.encryption_key.clone(),
    ]
    .into_iter()
    .flatten()
    {
        RedactingWriter::<std::io::Stderr>::add_secret(&secrets, value);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_ansi(false)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), secrets.clone()))
        .init();
}
