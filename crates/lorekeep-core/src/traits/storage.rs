// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait: the single source of truth for conversations,
//! messages, the job queue, findings and learnings.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LorekeepError;
use crate::job::JobPayload;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, Job, JobCounts, JobStatus, Learning, LearningDraft, Message, NewMessage,
    SanitizationFinding, StoreCounts,
};

/// Adapter for the transactional store.
///
/// Every operation is atomic on its own. Implementations must enforce the
/// cross-row invariants (per-conversation sequence assignment, single-claimant
/// dequeue) through the backend's own transaction guarantees.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), LorekeepError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), LorekeepError>;

    // --- Conversations ---

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, LorekeepError>;

    async fn find_conversation(
        &self,
        correlation_key: &str,
    ) -> Result<Option<Conversation>, LorekeepError>;

    /// Most recently updated first.
    async fn list_conversations(&self, limit: i64) -> Result<Vec<Conversation>, LorekeepError>;

    // --- Messages ---

    /// Sanitizes and appends a message, creating the conversation if needed
    /// and assigning the next sequence number in the same transaction.
    async fn append_message(&self, message: &NewMessage) -> Result<Message, LorekeepError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, LorekeepError>;

    /// All messages of a conversation ordered by sequence.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, LorekeepError>;

    // --- Job queue ---

    /// Inserts a `queued` job with zero attempts and returns its id.
    async fn enqueue(
        &self,
        job_type: &str,
        payload: &str,
        max_attempts: i32,
    ) -> Result<i64, LorekeepError>;

    /// Atomically claims the oldest queued job of `job_type`.
    async fn dequeue(&self, job_type: &str) -> Result<Option<Job>, LorekeepError>;

    /// Marks a claimed job completed. Calling it again is a no-op.
    async fn mark_completed(&self, id: i64) -> Result<(), LorekeepError>;

    /// Records a failed attempt of a claimed job.
    ///
    /// Returns the resulting status (`queued` while attempts remain,
    /// `dead_letter` once exhausted), or `None` if the job was not in progress.
    async fn mark_failed(&self, id: i64, error: &str) -> Result<Option<JobStatus>, LorekeepError>;

    async fn get_job(&self, id: i64) -> Result<Option<Job>, LorekeepError>;

    /// Oldest first, optionally filtered by status.
    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<Job>, LorekeepError>;

    async fn job_counts(&self) -> Result<JobCounts, LorekeepError>;

    /// Operator action: returns a dead-lettered job to `queued` with its
    /// attempt counter reset. Returns `false` if the job is not dead-lettered.
    async fn requeue_dead_letter(&self, id: i64) -> Result<bool, LorekeepError>;

    /// In-progress jobs not touched for longer than `older_than`.
    async fn list_stalled(&self, older_than: Duration) -> Result<Vec<Job>, LorekeepError>;

    /// Serializes a typed payload and enqueues it under its own type tag.
    async fn enqueue_job(
        &self,
        payload: &JobPayload,
        max_attempts: i32,
    ) -> Result<i64, LorekeepError> {
        let body = payload.to_json()?;
        self.enqueue(payload.job_type().as_str(), &body, max_attempts)
            .await
    }

    // --- Sanitization findings ---

    /// Records residual issues for a message, replacing any earlier finding.
    async fn record_finding(
        &self,
        message_id: &str,
        issues: &[String],
    ) -> Result<SanitizationFinding, LorekeepError>;

    async fn get_finding(
        &self,
        message_id: &str,
    ) -> Result<Option<SanitizationFinding>, LorekeepError>;

    // --- Learnings ---

    /// Sanitizes and stores a learning for a conversation.
    async fn insert_learning(
        &self,
        conversation_id: &str,
        draft: &LearningDraft,
    ) -> Result<Learning, LorekeepError>;

    /// Learnings, newest first, optionally for one conversation.
    async fn list_learnings(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<Learning>, LorekeepError>;

    /// Row counts for status reporting.
    async fn store_counts(&self) -> Result<StoreCounts, LorekeepError>;
}
