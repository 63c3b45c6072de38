// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sanitization findings: residual issues the deep validator reported for a
//! stored message.

use lorekeep_core::LorekeepError;
use lorekeep_sanitize::sanitize;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{finding_from_row, SanitizationFinding};

/// Record the issues found for a message.
///
/// A message has at most one finding; a later run replaces the issue list,
/// so redelivered validation jobs do not pile up rows. Issue descriptors
/// come from the validator and may quote text, so each is sanitized.
pub async fn record_finding(
    db: &Database,
    message_id: &str,
    issues: &[String],
) -> Result<SanitizationFinding, LorekeepError> {
    let message_id = message_id.to_string();
    let issues: Vec<String> = issues.iter().map(|issue| sanitize(issue)).collect();
    let issues = serde_json::to_string(&issues)
        .map_err(|e| LorekeepError::Internal(format!("failed to encode issues: {e}")))?;
    let id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| {
            conn.query_row(
                "INSERT INTO sanitization_findings (id, message_id, issues)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(message_id) DO UPDATE SET
                     issues = excluded.issues,
                     created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 RETURNING id, message_id, issues, created_at",
                params![id, message_id, issues],
                finding_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The finding recorded for a message, if any.
pub async fn get_finding(
    db: &Database,
    message_id: &str,
) -> Result<Option<SanitizationFinding>, LorekeepError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, message_id, issues, created_at
                 FROM sanitization_findings WHERE message_id = ?1",
                params![message_id],
                finding_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
