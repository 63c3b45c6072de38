// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capture-event ingestion.
//!
//! An external trigger hands over one JSON object per turn:
//!
//! ```json
//! {"prompt": "...", "response": "...", "session_id": "..."}
//! ```
//!
//! Every field is optional and unknown fields are ignored. The prompt is
//! stored as an `originator` message and the response as a `responder`
//! message, in that order and in the same conversation. Each stored message
//! raises a `sanitize_async` job; a stored response also raises an `extract`
//! job for the conversation.
//!
//! The producer must never be disturbed by capture problems, so
//! [`capture_line`] logs and swallows every failure.

use lorekeep_core::job::{ExtractPayload, SanitizeAsyncPayload};
use lorekeep_core::types::{ConversationTarget, Message, NewMessage, Role};
use lorekeep_core::{JobPayload, LorekeepError, StorageAdapter};
use lorekeep_sanitize::sanitize;
use serde::Deserialize;
use tracing::{debug, warn};

/// One captured turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaptureEvent {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl CaptureEvent {
    /// Parse one line of input. Blank lines and non-objects are rejected.
    pub fn parse(line: &str) -> Result<Self, LorekeepError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(LorekeepError::Internal("empty capture input".into()));
        }
        serde_json::from_str(line)
            .map_err(|e| LorekeepError::Internal(format!("malformed capture input: {e}")))
    }

    fn prompt(&self) -> Option<&str> {
        non_blank(&self.prompt)
    }

    fn response(&self) -> Option<&str> {
        non_blank(&self.response)
    }

    fn session_id(&self) -> Option<&str> {
        non_blank(&self.session_id)
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// What one event produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub conversation_id: Option<String>,
    pub message_ids: Vec<String>,
    pub job_ids: Vec<i64>,
}

/// Store an event's messages and raise their jobs.
///
/// Message append and job enqueue are separate store calls; a failure in
/// between leaves a stored message without its jobs.
pub async fn ingest(
    storage: &dyn StorageAdapter,
    event: &CaptureEvent,
    max_attempts: i32,
) -> Result<CaptureSummary, LorekeepError> {
    let mut summary = CaptureSummary::default();
    let mut target = match event.session_id() {
        Some(key) => ConversationTarget::Keyed(key.to_string()),
        None => ConversationTarget::Fresh,
    };

    let turns = [
        (Role::Originator, event.prompt()),
        (Role::Responder, event.response()),
    ];
    for (role, content) in turns {
        let Some(content) = content else { continue };

        let message = storage
            .append_message(&NewMessage {
                target: target.clone(),
                role,
                content: sanitize(content),
            })
            .await?;
        let job_id = storage
            .enqueue_job(&sanitize_job(&message), max_attempts)
            .await?;

        // A fresh conversation exists now; the response joins it.
        if target == ConversationTarget::Fresh {
            target = ConversationTarget::Existing(message.conversation_id.clone());
        }
        summary.conversation_id = Some(message.conversation_id.clone());
        summary.message_ids.push(message.id);
        summary.job_ids.push(job_id);
    }

    if event.response().is_some()
        && let Some(conversation_id) = &summary.conversation_id
    {
        let payload = JobPayload::Extract(ExtractPayload {
            conversation_id: conversation_id.clone(),
        });
        summary
            .job_ids
            .push(storage.enqueue_job(&payload, max_attempts).await?);
    }

    Ok(summary)
}

fn sanitize_job(message: &Message) -> JobPayload {
    JobPayload::SanitizeAsync(SanitizeAsyncPayload {
        message_id: message.id.clone(),
        conversation_id: message.conversation_id.clone(),
        sequence: message.sequence,
        created_at: message.created_at.clone(),
    })
}

/// Parse and ingest one line, logging instead of returning failures.
pub async fn capture_line(
    storage: &dyn StorageAdapter,
    line: &str,
    max_attempts: i32,
) -> Option<CaptureSummary> {
    let event = match CaptureEvent::parse(line) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "capture input ignored");
            return None;
        }
    };

    if event.prompt().is_none() && event.response().is_none() {
        debug!("capture event has neither prompt nor response");
        return None;
    }

    match ingest(storage, &event, max_attempts).await {
        Ok(summary) => {
            debug!(
                conversation_id = ?summary.conversation_id,
                messages = summary.message_ids.len(),
                jobs = summary.job_ids.len(),
                "capture stored"
            );
            Some(summary)
        }
        Err(e) => {
            warn!(error = %e, "capture failed");
            None
        }
    }
}
