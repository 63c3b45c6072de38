// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local extraction: keep the first code example a responder shared.

use async_trait::async_trait;
use lorekeep_core::traits::ExtractionStrategy;
use lorekeep_core::types::{
    Conversation, ExtractionOutcome, LearningCategory, LearningDraft, Message, Role,
};

/// Title given to every heuristic learning.
pub const CODE_EXAMPLE_TITLE: &str = "Code example shared";

const FENCE: &str = "```";

/// Finds the first responder message with a fenced code block and keeps the
/// block's body as a `technical` learning.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    /// The draft the heuristic produces for `messages`, if any.
    pub fn draft(messages: &[Message]) -> Option<LearningDraft> {
        messages
            .iter()
            .filter(|m| m.role == Role::Responder)
            .find_map(|m| {
                let body = first_fenced_block(&m.content)?;
                let content = if body.is_empty() {
                    m.content.clone()
                } else {
                    body.to_string()
                };
                Some(LearningDraft {
                    category: LearningCategory::Technical,
                    title: CODE_EXAMPLE_TITLE.to_string(),
                    content,
                })
            })
    }
}

#[async_trait]
impl ExtractionStrategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn extract(&self, _conversation: &Conversation, messages: &[Message]) -> ExtractionOutcome {
        match Self::draft(messages) {
            Some(draft) => ExtractionOutcome::Extracted(draft),
            None => ExtractionOutcome::NoLearning,
        }
    }
}

/// Body of the first closed ```` ``` ```` block, trimmed, without the
/// language tag on the opening line.
pub fn first_fenced_block(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let after_open = &text[open + FENCE.len()..];
    let close = after_open.find(FENCE)?;
    let inner = &after_open[..close];

    // Text on the opening line is a language tag, unless the block is a
    // single line like ```let x = 1;```.
    let body = match inner.find('\n') {
        Some(newline) => &inner[newline + 1..],
        None => inner,
    };
    Some(body.trim())
}
