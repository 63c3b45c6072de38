// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lorekeep jobs` and `lorekeep enqueue` command implementations.
//!
//! Operator tools for the queue: listing, retrying dead letters, reporting
//! jobs stuck `in_progress`, and raising jobs by hand.

use std::str::FromStr;
use std::time::Duration;

use clap::Subcommand;
use lorekeep_config::model::LorekeepConfig;
use lorekeep_core::job::{DeepValidatePayload, ExtractPayload};
use lorekeep_core::types::Job;
use lorekeep_core::{JobPayload, JobStatus, LorekeepError, StorageAdapter};

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List jobs, oldest first.
    List {
        /// Only jobs in this status (queued, in_progress, completed, failed, dead_letter).
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Return a dead-lettered job to the queue with its attempts reset.
    Retry { id: i64 },
    /// Report in-progress jobs that have not moved for a while.
    Stalled {
        /// Defaults to `queue.stalled_after_secs`.
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnqueueCommand {
    /// Re-audit a stored message with the deep validator.
    Validate { message_id: String },
    /// Run learning extraction over a conversation.
    Extract { conversation_id: String },
}

pub async fn run_jobs(config: &LorekeepConfig, command: JobsCommand) -> Result<(), LorekeepError> {
    let storage = crate::open_storage(config).await?;
    let result = dispatch(storage.as_ref(), config, command).await;
    storage.close().await?;
    result
}

async fn dispatch(
    storage: &dyn StorageAdapter,
    config: &LorekeepConfig,
    command: JobsCommand,
) -> Result<(), LorekeepError> {
    match command {
        JobsCommand::List {
            status,
            limit,
            json,
        } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let jobs = storage.list_jobs(status, limit).await?;
            if json {
                print_json(&jobs)?;
            } else {
                print_jobs(&jobs);
            }
        }
        JobsCommand::Retry { id } => println!("{}", retry(storage, id).await?),
        JobsCommand::Stalled { older_than_secs } => {
            let secs = older_than_secs.unwrap_or(config.queue.stalled_after_secs);
            let jobs = storage.list_stalled(Duration::from_secs(secs)).await?;
            if jobs.is_empty() {
                println!("no jobs in progress for more than {secs}s");
            } else {
                print_jobs(&jobs);
            }
        }
    }
    Ok(())
}

pub async fn run_enqueue(
    config: &LorekeepConfig,
    command: EnqueueCommand,
) -> Result<(), LorekeepError> {
    let storage = crate::open_storage(config).await?;
    let result = enqueue(storage.as_ref(), command, config.queue.max_attempts).await;
    storage.close().await?;

    let (job_type, id) = result?;
    println!("enqueued {job_type} job {id}");
    Ok(())
}

async fn retry(storage: &dyn StorageAdapter, id: i64) -> Result<String, LorekeepError> {
    if storage.requeue_dead_letter(id).await? {
        return Ok(format!("job {id} requeued"));
    }
    match storage.get_job(id).await? {
        Some(job) => Err(LorekeepError::Internal(format!(
            "job {id} is {}, only dead-lettered jobs can be retried",
            job.status
        ))),
        None => Err(LorekeepError::NotFound {
            entity: "job",
            id: id.to_string(),
        }),
    }
}

/// Raise one job. The referent must exist at enqueue time; the worker
/// still tolerates it disappearing later.
async fn enqueue(
    storage: &dyn StorageAdapter,
    command: EnqueueCommand,
    max_attempts: i32,
) -> Result<(&'static str, i64), LorekeepError> {
    let payload = match command {
        EnqueueCommand::Validate { message_id } => {
            if storage.get_message(&message_id).await?.is_none() {
                return Err(LorekeepError::NotFound {
                    entity: "message",
                    id: message_id,
                });
            }
            JobPayload::DeepValidate(DeepValidatePayload { message_id })
        }
        EnqueueCommand::Extract { conversation_id } => {
            if storage.get_conversation(&conversation_id).await?.is_none() {
                return Err(LorekeepError::NotFound {
                    entity: "conversation",
                    id: conversation_id,
                });
            }
            JobPayload::Extract(ExtractPayload { conversation_id })
        }
    };

    let id = storage.enqueue_job(&payload, max_attempts).await?;
    Ok((payload.job_type().as_str(), id))
}

fn parse_status(s: &str) -> Result<JobStatus, LorekeepError> {
    JobStatus::from_str(s).map_err(|_| {
        LorekeepError::Config(format!(
            "unknown job status `{s}` (expected queued, in_progress, completed, failed or dead_letter)"
        ))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LorekeepError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| LorekeepError::Internal(format!("failed to serialize output: {e}")))?;
    println!("{body}");
    Ok(())
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("no jobs");
        return;
    }
    println!(
        "{:>6}  {:<15} {:<12} {:>8}  {:<25} error",
        "id", "type", "status", "attempts", "updated"
    );
    for job in jobs {
        println!("{}", format_job(job));
    }
}

fn format_job(job: &Job) -> String {
    format!(
        "{:>6}  {:<15} {:<12} {:>8}  {:<25} {}",
        job.id,
        job.job_type,
        job.status.to_string(),
        format!("{}/{}", job.attempts, job.max_attempts),
        job.updated_at,
        job.error.as_deref().unwrap_or("-")
    )
}
