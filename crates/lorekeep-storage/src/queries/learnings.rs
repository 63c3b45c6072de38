// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Learnings derived from conversations.

use lorekeep_core::types::LearningDraft;
use lorekeep_core::LorekeepError;
use lorekeep_sanitize::sanitize;
use rusqlite::params;

use crate::database::Database;
use crate::models::{learning_from_row, Learning};

const LEARNING_COLUMNS: &str = "id, conversation_id, category, title, content, created_at";

/// Store a learning for a conversation.
///
/// Title and content pass through the fast sanitizer first. Extraction may
/// quote or paraphrase message text, and a provider's output is not trusted
/// to stay redacted.
pub async fn insert_learning(
    db: &Database,
    conversation_id: &str,
    draft: &LearningDraft,
) -> Result<Learning, LorekeepError> {
    let id = uuid::Uuid::new_v4().to_string();
    let conversation_id = conversation_id.to_string();
    let category = draft.category.to_string();
    let title = sanitize(&draft.title);
    let content = sanitize(&draft.content);

    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO learnings (id, conversation_id, category, title, content)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING {LEARNING_COLUMNS}"
                ),
                params![id, conversation_id, category, title, content],
                learning_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Learnings newest first, optionally restricted to one conversation.
pub async fn list_learnings(
    db: &Database,
    conversation_id: Option<&str>,
) -> Result<Vec<Learning>, LorekeepError> {
    let conversation_id = conversation_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEARNING_COLUMNS} FROM learnings
                 WHERE (?1 IS NULL OR conversation_id = ?1)
                 ORDER BY created_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], learning_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
