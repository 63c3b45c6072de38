// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the workers and the adapter traits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LorekeepError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Provider,
    Validator,
}

// --- Conversations and messages ---

/// A group of messages sharing one correlation key (or none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// External session identifier; `None` for unkeyed sessions.
    pub correlation_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Who produced a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The party that started the turn (the prompt author).
    Originator,
    /// The party answering the turn.
    Responder,
}

/// A persisted, sanitized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    /// Content after the fast sanitizer ran. Never raw input.
    pub content: String,
    /// 1-based, gapless within the conversation.
    pub sequence: i64,
    pub created_at: String,
}

/// Which conversation a new message belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationTarget {
    /// Get or create the conversation with this correlation key.
    Keyed(String),
    /// Append to an existing conversation by id.
    Existing(String),
    /// Start a new unkeyed conversation.
    Fresh,
}

/// A message to append. The store sanitizes `content` before writing it.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub target: ConversationTarget,
    pub role: Role,
    pub content: String,
}

// --- Jobs ---

/// Lifecycle state of a queued job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    /// Reserved by the schema; the queue itself never writes it.
    Failed,
    DeadLetter,
}

impl JobStatus {
    /// Whether no further transitions happen automatically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::DeadLetter)
    }
}

/// Job type tags known to the workers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Raised at ingestion for every stored message.
    SanitizeAsync,
    /// Raised by operators to re-audit a stored message.
    DeepValidate,
    /// Learning extraction for a conversation.
    Extract,
}

impl JobType {
    /// The tag stored in the `job_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::SanitizeAsync => "sanitize_async",
            JobType::DeepValidate => "deep_validate",
            JobType::Extract => "extract",
        }
    }
}

/// A row of the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: i64,
    /// Opaque type tag; see [`JobType`] for the tags the workers claim.
    pub job_type: String,
    /// Serialized payload whose shape is fixed by `job_type`.
    pub payload: String,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Job {
    /// Parses the type tag, if it is one the workers know.
    pub fn kind(&self) -> Option<JobType> {
        self.job_type.parse().ok()
    }
}

/// Number of jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub dead_letter: i64,
}

impl JobCounts {
    pub fn total(&self) -> i64 {
        self.queued + self.in_progress + self.completed + self.failed + self.dead_letter
    }
}

// --- Sanitization ---

/// Row counts across the store, for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub conversations: i64,
    pub messages: i64,
    pub findings: i64,
    pub learnings: i64,
}

/// Verdict of a deep validator over already-redacted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_clean: bool,
    /// Residual issue descriptors, e.g. `"address"`.
    #[serde(default)]
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn clean() -> Self {
        Self {
            is_clean: true,
            issues: Vec::new(),
        }
    }

    pub fn with_issues(issues: Vec<String>) -> Self {
        Self {
            is_clean: issues.is_empty(),
            issues,
        }
    }
}

/// Residual risk recorded for one message by the deep stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizationFinding {
    pub id: String,
    pub message_id: String,
    pub issues: Vec<String>,
    pub created_at: String,
}

// --- Learnings ---

/// Category of a derived learning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LearningCategory {
    Technical,
    Workflow,
    Debugging,
    Architecture,
    General,
}

/// A learning produced by an extraction strategy, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningDraft {
    pub category: LearningCategory,
    pub title: String,
    pub content: String,
}

/// A persisted learning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Learning {
    pub id: String,
    pub conversation_id: String,
    pub category: LearningCategory,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

/// Result of running an extraction strategy over a conversation.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// The strategy produced a learning.
    Extracted(LearningDraft),
    /// Nothing worth keeping. A normal result, not a failure.
    NoLearning,
    /// The strategy could not run; the job should be retried.
    Failed(LorekeepError),
}

// --- Reasoning provider ---

/// A single message sent to a reasoning provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// A non-streaming completion request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A completed provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}
