// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-backed extraction.
//!
//! Sends the transcript to a [`ProviderAdapter`] and asks for one learning as
//! a JSON object, or `null`. Any provider failure or reply that does not parse
//! degrades to [`HeuristicStrategy`], so this strategy never reports
//! [`ExtractionOutcome::Failed`].

use std::sync::Arc;

use async_trait::async_trait;
use lorekeep_core::traits::{ExtractionStrategy, ProviderAdapter};
use lorekeep_core::types::{
    Conversation, ExtractionOutcome, LearningCategory, LearningDraft, Message, ProviderMessage,
    ProviderRequest, Role,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::heuristic::HeuristicStrategy;

const EXTRACTION_PROMPT: &str = r#"You review a conversation between a user and an assistant and decide whether it contains one learning worth keeping for future work: a technique, a workflow, a debugging insight or an architectural decision.

Reply with a single JSON object and nothing else:
{"category": "technical" | "workflow" | "debugging" | "architecture" | "general", "title": "<short title>", "content": "<the learning as a standalone note>"}

If the conversation holds nothing worth keeping, reply with: null"#;

/// What the provider is asked to return.
#[derive(Debug, Deserialize)]
struct ReplyLearning {
    category: String,
    title: String,
    content: String,
}

/// Parsed provider reply.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Learning(LearningDraft),
    Nothing,
}

/// Extraction through a reasoning provider.
pub struct ReasoningStrategy {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
}

impl ReasoningStrategy {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    fn request(&self, messages: &[Message]) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(EXTRACTION_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: build_transcript(messages),
            }],
            max_tokens: self.max_tokens,
        }
    }

    fn fallback(messages: &[Message]) -> ExtractionOutcome {
        match HeuristicStrategy::draft(messages) {
            Some(draft) => ExtractionOutcome::Extracted(draft),
            None => ExtractionOutcome::NoLearning,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for ReasoningStrategy {
    fn name(&self) -> &str {
        "reasoning"
    }

    async fn extract(&self, conversation: &Conversation, messages: &[Message]) -> ExtractionOutcome {
        if messages.is_empty() {
            return ExtractionOutcome::NoLearning;
        }

        let response = match self.provider.complete(self.request(messages)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    conversation_id = %conversation.id,
                    error = %e,
                    "provider unavailable, using heuristic extraction"
                );
                return Self::fallback(messages);
            }
        };
        debug!(
            conversation_id = %conversation.id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "provider replied"
        );

        match parse_reply(&response.content) {
            Some(Reply::Learning(draft)) => ExtractionOutcome::Extracted(draft),
            Some(Reply::Nothing) => ExtractionOutcome::NoLearning,
            None => {
                warn!(
                    conversation_id = %conversation.id,
                    "unparseable provider reply, using heuristic extraction"
                );
                Self::fallback(messages)
            }
        }
    }
}

/// Render messages as `User:` / `Assistant:` lines, in sequence order.
pub fn build_transcript(messages: &[Message]) -> String {
    let mut transcript = String::new();
    for msg in messages {
        let speaker = match msg.role {
            Role::Originator => "User",
            Role::Responder => "Assistant",
        };
        transcript.push_str(speaker);
        transcript.push_str(": ");
        transcript.push_str(&msg.content);
        transcript.push('\n');
    }
    transcript
}

/// Parse a provider reply.
///
/// Tolerates a markdown fence around the JSON and prose around the object.
/// Unknown categories become `general`. Returns `None` when the reply is
/// neither `null` nor an object with a non-empty title and content.
pub fn parse_reply(reply: &str) -> Option<Reply> {
    let trimmed = reply.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    if unfenced == "null" {
        return Some(Reply::Nothing);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }

    let parsed: ReplyLearning = match serde_json::from_str(&unfenced[start..=end]) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "provider reply is not a learning object");
            return None;
        }
    };

    let title = parsed.title.trim();
    let content = parsed.content.trim();
    if title.is_empty() || content.is_empty() {
        return None;
    }

    Some(Reply::Learning(LearningDraft {
        category: parsed
            .category
            .trim()
            .parse()
            .unwrap_or(LearningCategory::General),
        title: title.to_string(),
        content: content.to_string(),
    }))
}
