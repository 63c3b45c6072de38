// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lorekeep status` command implementation.
//!
//! Summarizes the queue by status and the store by table. Dead letters and
//! stalled jobs are highlighted since they need an operator.

use std::io::IsTerminal;
use std::time::Duration;

use lorekeep_config::model::LorekeepConfig;
use lorekeep_core::types::{JobCounts, StoreCounts};
use lorekeep_core::{LorekeepError, StorageAdapter};
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub jobs: JobCounts,
    pub store: StoreCounts,
    /// In-progress jobs older than `queue.stalled_after_secs`.
    pub stalled: usize,
}

/// Run the `lorekeep status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &LorekeepConfig,
    json: bool,
    plain: bool,
) -> Result<(), LorekeepError> {
    let storage = crate::open_storage(config).await?;
    let status = collect(storage.as_ref(), config).await;
    storage.close().await?;
    let status = status?;

    if json {
        let body = serde_json::to_string_pretty(&status)
            .map_err(|e| LorekeepError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{body}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

async fn collect(
    storage: &dyn StorageAdapter,
    config: &LorekeepConfig,
) -> Result<StatusResponse, LorekeepError> {
    let stalled = storage
        .list_stalled(Duration::from_secs(config.queue.stalled_after_secs))
        .await?;
    Ok(StatusResponse {
        database_path: config.storage.database_path.clone(),
        jobs: storage.job_counts().await?,
        store: storage.store_counts().await?,
        stalled: stalled.len(),
    })
}

fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  lorekeep status");
    println!("  {}", "-".repeat(35));
    println!("    Database:      {}", status.database_path);
    println!();
    println!("    Conversations: {}", status.store.conversations);
    println!("    Messages:      {}", status.store.messages);
    println!("    Findings:      {}", status.store.findings);
    println!("    Learnings:     {}", status.store.learnings);
    println!();
    println!("    Queued:        {}", status.jobs.queued);
    println!("    In progress:   {}", status.jobs.in_progress);
    println!("    Completed:     {}", status.jobs.completed);
    println!(
        "    Dead letter:   {}",
        attention(status.jobs.dead_letter as usize, use_color)
    );
    println!("    Stalled:       {}", attention(status.stalled, use_color));
    println!();

    if status.jobs.dead_letter > 0 {
        println!("  Inspect with: lorekeep jobs list --status dead_letter");
        println!();
    }
}

/// Render a count that is only interesting when non-zero.
fn attention(count: usize, use_color: bool) -> String {
    if count == 0 {
        return "0".to_string();
    }
    if use_color {
        use colored::Colorize;
        format!("{} {}", "!".yellow(), count.to_string().yellow())
    } else {
        format!("[WARN] {count}")
    }
}
