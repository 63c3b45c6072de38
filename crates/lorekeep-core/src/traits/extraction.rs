// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction strategy trait for the learning worker.

use async_trait::async_trait;

use crate::types::{Conversation, ExtractionOutcome, Message};

/// Derives at most one learning from a conversation.
///
/// Strategies that depend on an external service are expected to degrade to
/// a local result themselves; [`ExtractionOutcome::Failed`] is reserved for
/// cases where no result can be produced at all.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// `messages` is the conversation's full history, ordered by sequence.
    async fn extract(&self, conversation: &Conversation, messages: &[Message]) -> ExtractionOutcome;
}
