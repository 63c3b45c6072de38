// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookups and store-wide counts.
//!
//! Conversations are created implicitly by
//! [`append_message`](crate::queries::messages::append_message).

use lorekeep_core::LorekeepError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{conversation_from_row, Conversation, StoreCounts};

const CONVERSATION_COLUMNS: &str = "id, correlation_key, created_at, updated_at";

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, LorekeepError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the conversation registered under a correlation key.
pub async fn find_conversation(
    db: &Database,
    correlation_key: &str,
) -> Result<Option<Conversation>, LorekeepError> {
    let key = correlation_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE correlation_key = ?1"
                ),
                params![key],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recently updated conversations first.
pub async fn list_conversations(
    db: &Database,
    limit: i64,
) -> Result<Vec<Conversation>, LorekeepError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 ORDER BY updated_at DESC, id ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], conversation_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Row counts for the status report.
pub async fn store_counts(db: &Database) -> Result<StoreCounts, LorekeepError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM conversations),
                    (SELECT COUNT(*) FROM messages),
                    (SELECT COUNT(*) FROM sanitization_findings),
                    (SELECT COUNT(*) FROM learnings)",
                [],
                |row| {
                    Ok(StoreCounts {
                        conversations: row.get(0)?,
                        messages: row.get(1)?,
                        findings: row.get(2)?,
                        learnings: row.get(3)?,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
