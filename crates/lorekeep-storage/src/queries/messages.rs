// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and reads.

use lorekeep_core::types::{ConversationTarget, NewMessage};
use lorekeep_core::LorekeepError;
use lorekeep_sanitize::sanitize;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::database::Database;
use crate::models::{message_from_row, Message};

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, sequence, created_at";

/// Sanitize and append a message.
///
/// Runs in one IMMEDIATE transaction: resolve or create the conversation,
/// take `MAX(sequence) + 1`, insert, bump the conversation's `updated_at`.
/// The write lock is held from the first statement, so concurrent appenders
/// (other handles, other processes) queue up behind `busy_timeout` and the
/// sequence stays gapless. `UNIQUE(conversation_id, sequence)` backs this.
pub async fn append_message(db: &Database, new: &NewMessage) -> Result<Message, LorekeepError> {
    let content = sanitize(&new.content);
    let role = new.role.to_string();
    let target = new.target.clone();
    let message_id = uuid::Uuid::new_v4().to_string();

    let missing_id = match &target {
        ConversationTarget::Existing(id) => Some(id.clone()),
        _ => None,
    };

    let appended = db
        .connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let conversation_id: Option<String> = match target {
                ConversationTarget::Keyed(key) => {
                    tx.execute(
                        "INSERT INTO conversations (id, correlation_key) VALUES (?1, ?2)
                         ON CONFLICT(correlation_key) DO NOTHING",
                        params![uuid::Uuid::new_v4().to_string(), key],
                    )?;
                    Some(tx.query_row(
                        "SELECT id FROM conversations WHERE correlation_key = ?1",
                        params![key],
                        |row| row.get(0),
                    )?)
                }
                ConversationTarget::Existing(id) => tx
                    .query_row(
                        "SELECT id FROM conversations WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?,
                ConversationTarget::Fresh => {
                    let id = uuid::Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO conversations (id, correlation_key) VALUES (?1, NULL)",
                        params![id],
                    )?;
                    Some(id)
                }
            };

            let Some(conversation_id) = conversation_id else {
                return Ok(None);
            };

            let sequence: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sequence), 0) + 1 FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, sequence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![message_id, conversation_id, role, content, sequence],
            )?;

            tx.execute(
                "UPDATE conversations SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![conversation_id],
            )?;

            let message = tx.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![message_id],
                message_from_row,
            )?;

            tx.commit()?;
            Ok(Some(message))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match appended {
        Some(message) => {
            debug!(
                message_id = %message.id,
                conversation_id = %message.conversation_id,
                sequence = message.sequence,
                "message appended"
            );
            Ok(message)
        }
        None => Err(LorekeepError::NotFound {
            entity: "conversation",
            id: missing_id.unwrap_or_default(),
        }),
    }
}

/// Get a message by ID.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, LorekeepError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages of a conversation, ordered by sequence.
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, LorekeepError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 ORDER BY sequence ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{find_conversation, get_conversation};
    use lorekeep_core::types::Role;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_msg(target: ConversationTarget, role: Role, content: &str) -> NewMessage {
        NewMessage {
            target,
            role,
            content: content.to_string(),
        }
    }

    fn keyed(key: &str) -> ConversationTarget {
        ConversationTarget::Keyed(key.to_string())
    }

    #[tokio::test]
    async fn append_assigns_gapless_sequence_in_order() {
        let (db, _dir) = setup_db().await;

        let m1 = append_message(&db, &new_msg(keyed("s1"), Role::Originator, "hello"))
            .await
            .unwrap();
        let m2 = append_message(&db, &new_msg(keyed("s1"), Role::Responder, "hi there"))
            .await
            .unwrap();
        let m3 = append_message(&db, &new_msg(keyed("s1"), Role::Originator, "thanks"))
            .await
            .unwrap();

        assert_eq!((m1.sequence, m2.sequence, m3.sequence), (1, 2, 3));
        assert_eq!(m1.conversation_id, m3.conversation_id);

        let messages = get_messages(&db, &m1.conversation_id).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![m1.id.as_str(), m2.id.as_str(), m3.id.as_str()]);
        assert_eq!(messages[1].role, Role::Responder);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sequences_are_per_conversation() {
        let (db, _dir) = setup_db().await;
        append_message(&db, &new_msg(keyed("a"), Role::Originator, "x"))
            .await
            .unwrap();
        let b = append_message(&db, &new_msg(keyed("b"), Role::Originator, "y"))
            .await
            .unwrap();
        assert_eq!(b.sequence, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn append_sanitizes_content() {
        let (db, _dir) = setup_db().await;
        let msg = append_message(
            &db,
            &new_msg(keyed("s1"), Role::Originator, "call 555-123-4567 or mail a@b.com"),
        )
        .await
        .unwrap();
        assert_eq!(msg.content, "call [REDACTED_PHONE] or mail [REDACTED_EMAIL]");

        let stored = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert!(lorekeep_sanitize::is_sanitized(&stored.content));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fresh_targets_create_unkeyed_conversations() {
        let (db, _dir) = setup_db().await;
        let a = append_message(&db, &new_msg(ConversationTarget::Fresh, Role::Originator, "a"))
            .await
            .unwrap();
        let b = append_message(&db, &new_msg(ConversationTarget::Fresh, Role::Originator, "b"))
            .await
            .unwrap();
        assert_ne!(a.conversation_id, b.conversation_id);

        let conv = get_conversation(&db, &a.conversation_id).await.unwrap().unwrap();
        assert!(conv.correlation_key.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn existing_target_appends_or_reports_missing() {
        let (db, _dir) = setup_db().await;
        let first = append_message(&db, &new_msg(ConversationTarget::Fresh, Role::Originator, "a"))
            .await
            .unwrap();
        let second = append_message(
            &db,
            &new_msg(
                ConversationTarget::Existing(first.conversation_id.clone()),
                Role::Responder,
                "b",
            ),
        )
        .await
        .unwrap();
        assert_eq!(second.sequence, 2);

        let err = append_message(
            &db,
            &new_msg(
                ConversationTarget::Existing("missing".to_string()),
                Role::Responder,
                "c",
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LorekeepError::NotFound { entity: "conversation", .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn append_bumps_conversation_updated_at() {
        let (db, _dir) = setup_db().await;
        append_message(&db, &new_msg(keyed("s1"), Role::Originator, "a"))
            .await
            .unwrap();
        let before = find_conversation(&db, "s1").await.unwrap().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        append_message(&db, &new_msg(keyed("s1"), Role::Responder, "b"))
            .await
            .unwrap();
        let after = find_conversation(&db, "s1").await.unwrap().unwrap();
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn timestamps_come_from_sqlite_in_utc_millis() {
        let (db, _dir) = setup_db().await;
        let msg = append_message(&db, &new_msg(keyed("s1"), Role::Originator, "a"))
            .await
            .unwrap();
        let ts = &msg.created_at;
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len(), "got {ts}");
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
        assert!(ts.ends_with('Z'));
        db.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_from_separate_handles_are_gapless() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let path = db_path.to_str().unwrap().to_string();

        // The first open applies migrations; later handles find them done.
        let first = Database::open(&path).await.unwrap();
        let mut handles = Vec::new();
        for i in 0..8 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                let db = Database::open(&path).await.unwrap();
                let mut sequences = Vec::new();
                for j in 0..5 {
                    let msg = append_message(
                        &db,
                        &NewMessage {
                            target: ConversationTarget::Keyed("shared".to_string()),
                            role: Role::Originator,
                            content: format!("writer {i} message {j}"),
                        },
                    )
                    .await
                    .unwrap();
                    sequences.push(msg.sequence);
                }
                db.close().await.unwrap();
                sequences
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (1..=40).collect::<Vec<i64>>());

        let conv = find_conversation(&first, "shared").await.unwrap().unwrap();
        assert_eq!(get_messages(&first, &conv.id).await.unwrap().len(), 40);
        first.close().await.unwrap();
    }
}
