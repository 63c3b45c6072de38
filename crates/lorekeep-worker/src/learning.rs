// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Learning extraction over whole conversations.

use std::sync::Arc;

use async_trait::async_trait;
use lorekeep_core::types::{ExtractionOutcome, Job, JobType};
use lorekeep_core::{ExtractionStrategy, JobPayload, LorekeepError, StorageAdapter};
use tracing::{debug, info};

use crate::harness::{JobHandler, JobOutcome};

/// Handles `extract` jobs.
pub struct LearningHandler {
    storage: Arc<dyn StorageAdapter>,
    strategy: Arc<dyn ExtractionStrategy>,
}

impl LearningHandler {
    pub fn new(storage: Arc<dyn StorageAdapter>, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        Self { storage, strategy }
    }
}

#[async_trait]
impl JobHandler for LearningHandler {
    fn name(&self) -> &str {
        "learning"
    }

    fn job_types(&self) -> &[JobType] {
        &[JobType::Extract]
    }

    async fn handle(&self, job: &Job, payload: JobPayload) -> Result<JobOutcome, LorekeepError> {
        let conversation_id =
            payload
                .conversation_id()
                .ok_or_else(|| LorekeepError::MalformedPayload {
                    job_type: job.job_type.clone(),
                    message: "payload names no conversation".to_string(),
                })?;

        let Some(conversation) = self.storage.get_conversation(conversation_id).await? else {
            return Ok(JobOutcome::Vacuous(format!(
                "conversation {conversation_id} not found"
            )));
        };
        let messages = self.storage.get_messages(&conversation.id).await?;

        match self.strategy.extract(&conversation, &messages).await {
            ExtractionOutcome::Extracted(draft) => {
                let learning = self.storage.insert_learning(&conversation.id, &draft).await?;
                info!(
                    job_id = job.id,
                    conversation_id,
                    learning_id = %learning.id,
                    category = %learning.category,
                    strategy = self.strategy.name(),
                    "learning stored"
                );
                Ok(JobOutcome::Processed)
            }
            ExtractionOutcome::NoLearning => {
                debug!(job_id = job.id, conversation_id, "no learning in conversation");
                Ok(JobOutcome::Processed)
            }
            ExtractionOutcome::Failed(e) => Err(e),
        }
    }
}
