// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lorekeep doctor` command implementation.
//!
//! Runs diagnostic checks against the Lorekeep environment to identify
//! configuration issues, database problems and queue trouble.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use lorekeep_config::model::LorekeepConfig;
use lorekeep_core::types::HealthStatus;
use lorekeep_core::{LorekeepError, PluginAdapter, StorageAdapter};
use lorekeep_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `lorekeep doctor` command.
pub async fn run_doctor(config: &LorekeepConfig, plain: bool) -> Result<(), LorekeepError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![check_config(config)];
    results.extend(check_database(config).await);
    results.push(check_validator(config).await);
    results.push(check_reasoning(config));

    println!();
    println!("  lorekeep doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", format_result(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_result(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// The configuration was loaded and validated before any command ran; this
/// only reports where it points.
fn check_config(config: &LorekeepConfig) -> CheckResult {
    let start = Instant::now();
    match lorekeep_config::validation::validate_config(config) {
        Ok(()) => CheckResult::new(
            "Configuration",
            CheckStatus::Pass,
            format!(
                "valid (validator: {:?}, reasoning: {})",
                config.validator.kind,
                if config.extraction.reasoning_enabled {
                    "on"
                } else {
                    "off"
                }
            ),
            start,
        ),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Database reachability, integrity and queue health.
///
/// A missing database file is only a warning; doctor never creates it.
async fn check_database(config: &LorekeepConfig) -> Vec<CheckResult> {
    let start = Instant::now();
    let db_path = &config.storage.database_path;

    if !std::path::Path::new(db_path).exists() {
        return vec![CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        )];
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return vec![CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        )];
    }

    let mut results = vec![match storage.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Database", CheckStatus::Pass, "connected", start)
        }
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Database", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Database", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }];
    results.push(check_integrity(&storage).await);
    results.push(check_queue(&storage, config).await);

    if let Err(e) = storage.close().await {
        results.push(CheckResult::new(
            "Database close",
            CheckStatus::Warn,
            e.to_string(),
            start,
        ));
    }
    results
}

async fn check_integrity(storage: &SqliteStorage) -> CheckResult {
    let start = Instant::now();
    let db = match storage.database() {
        Ok(db) => db,
        Err(e) => return CheckResult::new("DB integrity", CheckStatus::Fail, e.to_string(), start),
    };

    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await;

    match rows {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    }
}

async fn check_queue(storage: &SqliteStorage, config: &LorekeepConfig) -> CheckResult {
    let start = Instant::now();
    let counts = match storage.job_counts().await {
        Ok(counts) => counts,
        Err(e) => {
            return CheckResult::new("Job queue", CheckStatus::Fail, e.to_string(), start);
        }
    };
    let stalled = storage
        .list_stalled(Duration::from_secs(config.queue.stalled_after_secs))
        .await
        .map(|jobs| jobs.len())
        .unwrap_or(0);

    queue_result(counts.queued, counts.dead_letter, stalled, start)
}

fn queue_result(queued: i64, dead_letter: i64, stalled: usize, start: Instant) -> CheckResult {
    if dead_letter > 0 || stalled > 0 {
        CheckResult::new(
            "Job queue",
            CheckStatus::Warn,
            format!("{dead_letter} dead-lettered, {stalled} stalled"),
            start,
        )
    } else {
        CheckResult::new(
            "Job queue",
            CheckStatus::Pass,
            format!("{queued} queued"),
            start,
        )
    }
}

async fn check_validator(config: &LorekeepConfig) -> CheckResult {
    let start = Instant::now();
    let validator = match crate::worker::build_validator(&config.validator) {
        Ok(validator) => validator,
        Err(e) => return CheckResult::new("Deep validator", CheckStatus::Fail, e.to_string(), start),
    };

    match validator.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Deep validator",
            CheckStatus::Pass,
            validator.name().to_string(),
            start,
        ),
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Deep validator", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Deep validator", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new("Deep validator", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Reasoning needs an API key; without one extraction silently uses the
/// heuristic, which is worth a warning.
fn check_reasoning(config: &LorekeepConfig) -> CheckResult {
    let start = Instant::now();
    if !config.extraction.reasoning_enabled {
        return CheckResult::new(
            "Reasoning",
            CheckStatus::Pass,
            "disabled (heuristic extraction)",
            start,
        );
    }

    match lorekeep_anthropic::resolve_api_key(&config.anthropic.api_key) {
        Ok(_) => CheckResult::new(
            "Reasoning",
            CheckStatus::Pass,
            format!("model {}", config.extraction.model),
            start,
        ),
        Err(_) => CheckResult::new(
            "Reasoning",
            CheckStatus::Warn,
            "no API key configured, heuristic extraction will be used",
            start,
        ),
    }
}
