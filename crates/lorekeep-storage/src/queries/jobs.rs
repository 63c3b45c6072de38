// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue operations.
//!
//! Every state transition is a single conditional statement, so no caller
//! can observe or act on a half-applied transition:
//!
//! ```text
//! queued --dequeue--> in_progress --mark_completed--> completed
//!                          |
//!                          +--mark_failed--> queued       (attempts < max)
//!                          +--mark_failed--> dead_letter  (attempts == max)
//! dead_letter --requeue_dead_letter--> queued  (operator only)
//! ```

use std::time::Duration;

use lorekeep_core::LorekeepError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{job_from_row, parse_column, Job, JobCounts, JobStatus};

const JOB_COLUMNS: &str =
    "id, job_type, payload, status, attempts, max_attempts, error, created_at, updated_at";

/// Insert a queued job with zero attempts. Returns the job ID.
pub async fn enqueue(
    db: &Database,
    job_type: &str,
    payload: &str,
    max_attempts: i32,
) -> Result<i64, LorekeepError> {
    let job_type = job_type.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO jobs (job_type, payload, max_attempts) VALUES (?1, ?2, ?3)",
                params![job_type, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the oldest queued job of `job_type`.
///
/// The select and the status flip are one statement. Two claimants racing
/// for the same row serialize on SQLite's write lock; the loser's
/// `status = 'queued'` guard no longer holds and it gets `None`.
pub async fn dequeue(db: &Database, job_type: &str) -> Result<Option<Job>, LorekeepError> {
    let job_type = job_type.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE jobs
                     SET status = 'in_progress',
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = (
                         SELECT id FROM jobs
                         WHERE job_type = ?1 AND status = 'queued'
                         ORDER BY created_at ASC, id ASC
                         LIMIT 1
                     )
                     AND status = 'queued'
                     RETURNING {JOB_COLUMNS}"
                ),
                params![job_type],
                job_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a claimed job completed.
///
/// Applies to `in_progress` jobs and is a no-op on `completed` ones, so a
/// redelivered acknowledgement is harmless. Returns whether the job is now
/// completed; a queued or dead-lettered job is left untouched.
pub async fn mark_completed(db: &Database, id: i64) -> Result<bool, LorekeepError> {
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE jobs
                 SET status = 'completed',
                     error = NULL,
                     updated_at = CASE WHEN status = 'completed' THEN updated_at
                                       ELSE strftime('%Y-%m-%dT%H:%M:%fZ', 'now') END
                 WHERE id = ?1 AND status IN ('in_progress', 'completed')",
                params![id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt of a claimed job.
///
/// Increments `attempts`, stores `error` and returns the job to `queued`
/// while attempts remain, otherwise moves it to `dead_letter`. Returns the
/// new status, or `None` if the job was not `in_progress`.
pub async fn mark_failed(
    db: &Database,
    id: i64,
    error: &str,
) -> Result<Option<JobStatus>, LorekeepError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "UPDATE jobs
                 SET attempts = attempts + 1,
                     error = ?2,
                     status = CASE WHEN attempts + 1 >= max_attempts
                                   THEN 'dead_letter' ELSE 'queued' END,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'in_progress'
                 RETURNING status",
                params![id, error],
                |row| parse_column(row, 0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a job by ID.
pub async fn get_job(db: &Database, id: i64) -> Result<Option<Job>, LorekeepError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                job_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List jobs oldest first, optionally filtered by status.
pub async fn list_jobs(
    db: &Database,
    status: Option<JobStatus>,
    limit: i64,
) -> Result<Vec<Job>, LorekeepError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit], job_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of jobs in each status.
pub async fn job_counts(db: &Database) -> Result<JobCounts, LorekeepError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((parse_column::<JobStatus>(row, 0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = JobCounts::default();
            for row in rows {
                let (status, n) = row?;
                match status {
                    JobStatus::Queued => counts.queued = n,
                    JobStatus::InProgress => counts.in_progress = n,
                    JobStatus::Completed => counts.completed = n,
                    JobStatus::Failed => counts.failed = n,
                    JobStatus::DeadLetter => counts.dead_letter = n,
                }
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return a dead-lettered job to the queue with its attempt counter reset.
///
/// The last error is kept for reference. Returns `false` if the job does not
/// exist or is not dead-lettered.
pub async fn requeue_dead_letter(db: &Database, id: i64) -> Result<bool, LorekeepError> {
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE jobs
                 SET status = 'queued',
                     attempts = 0,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'dead_letter'",
                params![id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `in_progress` jobs whose last transition is older than `older_than`.
///
/// These are usually jobs whose worker died after claiming them. Nothing
/// reclaims them automatically.
pub async fn list_stalled(db: &Database, older_than: Duration) -> Result<Vec<Job>, LorekeepError> {
    let modifier = format!("-{:.3} seconds", older_than.as_secs_f64());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE status = 'in_progress'
                   AND updated_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)
                 ORDER BY updated_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![modifier], job_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
