// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-band audit of stored messages.
//!
//! Runs the deep validator over content the fast sanitizer already redacted
//! and records what it still finds. Message content is never rewritten here.

use std::sync::Arc;

use async_trait::async_trait;
use lorekeep_core::types::{Job, JobType};
use lorekeep_core::{DeepValidator, JobPayload, LorekeepError, StorageAdapter};
use tracing::{debug, info};

use crate::harness::{JobHandler, JobOutcome};

/// Handles `sanitize_async` and `deep_validate` jobs.
pub struct SanitizationHandler {
    storage: Arc<dyn StorageAdapter>,
    validator: Arc<dyn DeepValidator>,
}

impl SanitizationHandler {
    pub fn new(storage: Arc<dyn StorageAdapter>, validator: Arc<dyn DeepValidator>) -> Self {
        Self { storage, validator }
    }
}

#[async_trait]
impl JobHandler for SanitizationHandler {
    fn name(&self) -> &str {
        "sanitization"
    }

    fn job_types(&self) -> &[JobType] {
        &[JobType::SanitizeAsync, JobType::DeepValidate]
    }

    async fn handle(&self, job: &Job, payload: JobPayload) -> Result<JobOutcome, LorekeepError> {
        let message_id = payload
            .message_id()
            .ok_or_else(|| LorekeepError::MalformedPayload {
                job_type: job.job_type.clone(),
                message: "payload names no message".to_string(),
            })?;

        let Some(message) = self.storage.get_message(message_id).await? else {
            return Ok(JobOutcome::Vacuous(format!("message {message_id} not found")));
        };

        let report = self.validator.validate(&message.content).await?;
        if report.is_clean {
            debug!(job_id = job.id, message_id, "message clean");
            return Ok(JobOutcome::Processed);
        }

        let finding = self
            .storage
            .record_finding(&message.id, &report.issues)
            .await?;
        info!(
            job_id = job.id,
            message_id,
            validator = self.validator.name(),
            issues = ?finding.issues,
            "residual issues recorded"
        );
        Ok(JobOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Tick, Worker};
    use lorekeep_config::model::StorageConfig;
    use lorekeep_core::job::{DeepValidatePayload, SanitizeAsyncPayload};
    use lorekeep_core::types::{ConversationTarget, JobStatus, NewMessage, Role, ValidationReport};
    use lorekeep_sanitize::PatternValidator;
    use lorekeep_storage::SqliteStorage;
    use lorekeep_test_utils::MockValidator;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn storage() -> (Arc<SqliteStorage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("sanitize.db").to_string_lossy().to_string(),
            ..StorageConfig::default()
        });
        storage.initialize().await.unwrap();
        (Arc::new(storage), dir)
    }

    async fn stored(storage: &SqliteStorage, content: &str) -> lorekeep_core::types::Message {
        storage
            .append_message(&NewMessage {
                target: ConversationTarget::Keyed("s1".into()),
                role: Role::Originator,
                content: content.into(),
            })
            .await
            .unwrap()
    }

    fn async_payload(message: &lorekeep_core::types::Message) -> JobPayload {
        JobPayload::SanitizeAsync(SanitizeAsyncPayload {
            message_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            sequence: message.sequence,
            created_at: message.created_at.clone(),
        })
    }

    fn worker(storage: Arc<SqliteStorage>, validator: Arc<dyn DeepValidator>) -> Worker {
        let handler = SanitizationHandler::new(storage.clone(), validator);
        Worker::new(storage, Arc::new(handler), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn residual_issues_become_a_finding() {
        let (storage, _dir) = storage().await;
        let message = stored(&storage, "ship it to 42 Elm Street please").await;
        let job = storage.enqueue_job(&async_payload(&message), 3).await.unwrap();

        let w = worker(storage.clone(), Arc::new(PatternValidator::new()));
        assert_eq!(w.tick().await.unwrap(), Tick::Committed(job));

        let finding = storage.get_finding(&message.id).await.unwrap().unwrap();
        assert_eq!(finding.issues, vec!["address"]);
        let after = storage.get_message(&message.id).await.unwrap().unwrap();
        assert_eq!(after.content, message.content);
    }

    #[tokio::test]
    async fn clean_message_records_nothing() {
        let (storage, _dir) = storage().await;
        let message = stored(&storage, "the build is green").await;
        storage.enqueue_job(&async_payload(&message), 3).await.unwrap();

        let validator = Arc::new(MockValidator::new());
        let w = worker(storage.clone(), validator.clone());
        assert!(matches!(w.tick().await.unwrap(), Tick::Committed(_)));

        assert!(storage.get_finding(&message.id).await.unwrap().is_none());
        assert_eq!(validator.seen().await, vec!["the build is green".to_string()]);
    }

    #[tokio::test]
    async fn validator_sees_only_redacted_content() {
        let (storage, _dir) = storage().await;
        let message = stored(&storage, "mail carol@example.com").await;
        storage
            .enqueue_job(
                &JobPayload::DeepValidate(DeepValidatePayload {
                    message_id: message.id.clone(),
                }),
                3,
            )
            .await
            .unwrap();

        let validator = Arc::new(MockValidator::new());
        worker(storage.clone(), validator.clone()).tick().await.unwrap();
        assert_eq!(validator.seen().await, vec!["mail [REDACTED_EMAIL]".to_string()]);
    }

    #[tokio::test]
    async fn redelivery_keeps_one_finding() {
        let (storage, _dir) = storage().await;
        let message = stored(&storage, "text").await;
        let validator = Arc::new(MockValidator::with_reports(vec![
            ValidationReport::with_issues(vec!["ssn".into()]),
            ValidationReport::with_issues(vec!["ssn".into(), "address".into()]),
        ]));
        let w = worker(storage.clone(), validator);

        storage.enqueue_job(&async_payload(&message), 3).await.unwrap();
        storage.enqueue_job(&async_payload(&message), 3).await.unwrap();
        w.tick().await.unwrap();
        w.tick().await.unwrap();

        let finding = storage.get_finding(&message.id).await.unwrap().unwrap();
        assert_eq!(finding.issues, vec!["ssn", "address"]);
        assert_eq!(storage.store_counts().await.unwrap().findings, 1);
    }

    #[tokio::test]
    async fn missing_message_completes_vacuously() {
        let (storage, _dir) = storage().await;
        let job = storage
            .enqueue_job(
                &JobPayload::DeepValidate(DeepValidatePayload {
                    message_id: "gone".into(),
                }),
                3,
            )
            .await
            .unwrap();

        let validator = Arc::new(MockValidator::new());
        let w = worker(storage.clone(), validator.clone());
        assert_eq!(w.tick().await.unwrap(), Tick::Committed(job));
        assert!(validator.seen().await.is_empty());
    }

    #[tokio::test]
    async fn validator_outage_retries_until_dead_letter() {
        let (storage, _dir) = storage().await;
        let message = stored(&storage, "text").await;
        let job = storage.enqueue_job(&async_payload(&message), 2).await.unwrap();

        let w = worker(storage.clone(), Arc::new(MockValidator::unavailable()));
        assert_eq!(w.tick().await.unwrap(), Tick::Retried(job));
        assert_eq!(w.tick().await.unwrap(), Tick::DeadLettered(job));

        let job = storage.get_job(job).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::DeadLetter);
        assert!(storage.get_finding(&message.id).await.unwrap().is_none());
    }
}
