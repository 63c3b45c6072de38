// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker execution contract shared by every job handler.
//!
//! One [`Worker::tick`] is one pass through
//! `Idle -> Claimed -> Processing -> {Committed | Retried | DeadLettered} -> Idle`.
//! Whatever happens while processing, the claimed job leaves `in_progress`
//! through exactly one of `mark_completed` or `mark_failed`: decode errors,
//! handler errors and handler panics all become `mark_failed`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use lorekeep_core::types::{Job, JobStatus, JobType};
use lorekeep_core::{JobPayload, LorekeepError, StorageAdapter};
use lorekeep_sanitize::sanitize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a handler run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job did its work.
    Processed,
    /// The job's referent no longer exists; there is nothing to do.
    Vacuous(String),
}

/// Work performed for one or more job types.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Job types this handler consumes. The worker polls them in rotation,
    /// starting after the type it last claimed, so no type starves another.
    fn job_types(&self) -> &[JobType];

    /// Process a claimed job whose payload already decoded.
    ///
    /// An error is a retryable failure; it is recorded on the job and the
    /// job is requeued until its attempts run out.
    async fn handle(&self, job: &Job, payload: JobPayload) -> Result<JobOutcome, LorekeepError>;
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No queued job of any handled type.
    Idle,
    /// The job completed.
    Committed(i64),
    /// The job failed and went back to the queue.
    Retried(i64),
    /// The job failed its last attempt.
    DeadLettered(i64),
}

/// Polls the queue for a handler's job types and runs the handler.
pub struct Worker {
    storage: Arc<dyn StorageAdapter>,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
    /// Index into `job_types()` the next tick polls first.
    next_type: AtomicUsize,
}

impl Worker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        handler: Arc<dyn JobHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            storage,
            handler,
            poll_interval,
            next_type: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// Claim and process at most one job.
    ///
    /// Errors are store errors only. A store error after the claim leaves
    /// the job `in_progress`, where `list_stalled` reports it.
    pub async fn tick(&self) -> Result<Tick, LorekeepError> {
        let job_types = self.handler.job_types();
        let start = self.next_type.load(Ordering::Relaxed);
        for offset in 0..job_types.len() {
            let idx = (start + offset) % job_types.len();
            if let Some(job) = self.storage.dequeue(job_types[idx].as_str()).await? {
                self.next_type.store(idx + 1, Ordering::Relaxed);
                return self.process(job).await;
            }
        }
        Ok(Tick::Idle)
    }

    async fn process(&self, job: Job) -> Result<Tick, LorekeepError> {
        debug!(
            worker = self.name(),
            job_id = job.id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            "job claimed"
        );

        let payload = match JobPayload::decode(&job.job_type, &job.payload) {
            Ok(payload) => payload,
            Err(e) => return self.fail(&job, &e.to_string()).await,
        };

        let run = AssertUnwindSafe(self.handler.handle(&job, payload))
            .catch_unwind()
            .await;

        match run {
            Ok(Ok(JobOutcome::Processed)) => {
                self.storage.mark_completed(job.id).await?;
                debug!(worker = self.name(), job_id = job.id, "job completed");
                Ok(Tick::Committed(job.id))
            }
            Ok(Ok(JobOutcome::Vacuous(reason))) => {
                info!(
                    worker = self.name(),
                    job_id = job.id,
                    reason = %reason,
                    "nothing to do, completing job"
                );
                self.storage.mark_completed(job.id).await?;
                Ok(Tick::Committed(job.id))
            }
            Ok(Err(e)) => self.fail(&job, &e.to_string()).await,
            Err(panic) => {
                let message = format!("handler panicked: {}", panic_message(panic.as_ref()));
                error!(worker = self.name(), job_id = job.id, "{message}");
                self.fail(&job, &message).await
            }
        }
    }

    async fn fail(&self, job: &Job, reason: &str) -> Result<Tick, LorekeepError> {
        // Error text can quote payload or upstream bodies.
        let reason = sanitize(reason);
        match self.storage.mark_failed(job.id, &reason).await? {
            Some(JobStatus::DeadLetter) => {
                error!(
                    worker = self.name(),
                    job_id = job.id,
                    job_type = %job.job_type,
                    error = %reason,
                    "job dead-lettered"
                );
                Ok(Tick::DeadLettered(job.id))
            }
            Some(_) => {
                warn!(
                    worker = self.name(),
                    job_id = job.id,
                    attempt = job.attempts + 1,
                    max_attempts = job.max_attempts,
                    error = %reason,
                    "job failed, requeued"
                );
                Ok(Tick::Retried(job.id))
            }
            None => {
                warn!(
                    worker = self.name(),
                    job_id = job.id,
                    "failed job was no longer in progress"
                );
                Ok(Tick::Idle)
            }
        }
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// After a committed job the next poll is immediate; otherwise the worker
    /// sleeps for the poll interval. Cancellation is observed between jobs
    /// only, so a claimed job always finishes.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(worker = self.name(), "worker started");
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.tick().await {
                Ok(Tick::Committed(_)) => continue,
                Ok(_) => {}
                Err(e) => warn!(worker = self.name(), error = %e, "poll failed"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!(worker = self.name(), "worker stopped");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeep_config::model::StorageConfig;
    use lorekeep_core::job::{DeepValidatePayload, ExtractPayload};
    use lorekeep_storage::SqliteStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Behaviour scripted per call: `Ok`, `Err`, `Vacuous` or panic.
    #[derive(Clone, Copy)]
    enum Script {
        Succeed,
        Fail,
        Vacuous,
        Panic,
    }

    struct ScriptedHandler {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedHandler {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JobHandler for ScriptedHandler {
        fn name(&self) -> &str {
            "scripted"
        }

        fn job_types(&self) -> &[JobType] {
            &[JobType::Extract, JobType::DeepValidate]
        }

        async fn handle(&self, _job: &Job, _payload: JobPayload) -> Result<JobOutcome, LorekeepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Succeed => Ok(JobOutcome::Processed),
                Script::Fail => Err(LorekeepError::Validator {
                    message: "validator unreachable".into(),
                    source: None,
                }),
                Script::Vacuous => Ok(JobOutcome::Vacuous("gone".into())),
                Script::Panic => panic!("handler blew up"),
            }
        }
    }

    async fn storage() -> (Arc<SqliteStorage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("worker.db").to_string_lossy().to_string(),
            ..StorageConfig::default()
        });
        storage.initialize().await.unwrap();
        (Arc::new(storage), dir)
    }

    fn extract(conversation_id: &str) -> JobPayload {
        JobPayload::Extract(ExtractPayload {
            conversation_id: conversation_id.into(),
        })
    }

    fn worker(storage: Arc<SqliteStorage>, handler: Arc<ScriptedHandler>) -> Worker {
        Worker::new(storage, handler, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn idle_when_queue_is_empty() {
        let (storage, _dir) = storage().await;
        let handler = ScriptedHandler::new(Script::Succeed);
        let w = worker(storage.clone(), handler.clone());
        assert_eq!(w.tick().await.unwrap(), Tick::Idle);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn processed_job_is_committed() {
        let (storage, _dir) = storage().await;
        let id = storage.enqueue_job(&extract("c1"), 3).await.unwrap();
        let w = worker(storage.clone(), ScriptedHandler::new(Script::Succeed));

        assert_eq!(w.tick().await.unwrap(), Tick::Committed(id));
        let job = storage.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn job_types_are_polled_in_order() {
        let (storage, _dir) = storage().await;
        let validate = storage
            .enqueue_job(
                &JobPayload::DeepValidate(DeepValidatePayload {
                    message_id: "m1".into(),
                }),
                3,
            )
            .await
            .unwrap();
        let ext = storage.enqueue_job(&extract("c1"), 3).await.unwrap();
        let w = worker(storage.clone(), ScriptedHandler::new(Script::Succeed));

        assert_eq!(w.tick().await.unwrap(), Tick::Committed(ext));
        assert_eq!(w.tick().await.unwrap(), Tick::Committed(validate));
        assert_eq!(w.tick().await.unwrap(), Tick::Idle);
    }

    #[tokio::test]
    async fn busy_first_type_does_not_starve_the_second() {
        let (storage, _dir) = storage().await;
        let mut extracts = Vec::new();
        for c in ["c1", "c2", "c3"] {
            extracts.push(storage.enqueue_job(&extract(c), 3).await.unwrap());
        }
        let validate = storage
            .enqueue_job(
                &JobPayload::DeepValidate(DeepValidatePayload {
                    message_id: "m1".into(),
                }),
                3,
            )
            .await
            .unwrap();
        let w = worker(storage.clone(), ScriptedHandler::new(Script::Succeed));

        let mut claimed = Vec::new();
        loop {
            match w.tick().await.unwrap() {
                Tick::Committed(id) => claimed.push(id),
                Tick::Idle => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(
            claimed,
            vec![extracts[0], validate, extracts[1], extracts[2]]
        );
    }

    #[tokio::test]
    async fn vacuous_job_is_committed() {
        let (storage, _dir) = storage().await;
        let id = storage.enqueue_job(&extract("missing"), 3).await.unwrap();
        let w = worker(storage.clone(), ScriptedHandler::new(Script::Vacuous));

        assert_eq!(w.tick().await.unwrap(), Tick::Committed(id));
        assert_eq!(
            storage.get_job(id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn failures_retry_then_dead_letter() {
        let (storage, _dir) = storage().await;
        let id = storage.enqueue_job(&extract("c1"), 3).await.unwrap();
        let handler = ScriptedHandler::new(Script::Fail);
        let w = worker(storage.clone(), handler.clone());

        assert_eq!(w.tick().await.unwrap(), Tick::Retried(id));
        assert_eq!(w.tick().await.unwrap(), Tick::Retried(id));
        assert_eq!(w.tick().await.unwrap(), Tick::DeadLettered(id));
        assert_eq!(w.tick().await.unwrap(), Tick::Idle);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);

        let job = storage.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::DeadLetter);
        assert_eq!(job.attempts, 3);
        assert!(job.error.unwrap().contains("validator unreachable"));
    }

    #[tokio::test]
    async fn panic_is_recorded_as_failure() {
        let (storage, _dir) = storage().await;
        let id = storage.enqueue_job(&extract("c1"), 1).await.unwrap();
        let w = worker(storage.clone(), ScriptedHandler::new(Script::Panic));

        assert_eq!(w.tick().await.unwrap(), Tick::DeadLettered(id));
        let job = storage.get_job(id).await.unwrap().unwrap();
        assert!(job.error.unwrap().contains("handler blew up"));
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_calling_handler() {
        let (storage, _dir) = storage().await;
        let id = storage
            .enqueue("extract", r#"{"messageId":"m1"}"#, 2)
            .await
            .unwrap();
        let handler = ScriptedHandler::new(Script::Succeed);
        let w = worker(storage.clone(), handler.clone());

        assert_eq!(w.tick().await.unwrap(), Tick::Retried(id));
        assert_eq!(w.tick().await.unwrap(), Tick::DeadLettered(id));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        let job = storage.get_job(id).await.unwrap().unwrap();
        assert!(job.error.unwrap().contains("malformed extract payload"));
    }

    #[tokio::test]
    async fn failure_text_is_sanitized() {
        struct Leaky;
        #[async_trait]
        impl JobHandler for Leaky {
            fn name(&self) -> &str {
                "leaky"
            }
            fn job_types(&self) -> &[JobType] {
                &[JobType::Extract]
            }
            async fn handle(&self, _: &Job, _: JobPayload) -> Result<JobOutcome, LorekeepError> {
                Err(LorekeepError::Internal("upstream echoed bob@example.com".into()))
            }
        }

        let (storage, _dir) = storage().await;
        let id = storage.enqueue_job(&extract("c1"), 3).await.unwrap();
        let w = Worker::new(storage.clone(), Arc::new(Leaky), Duration::from_millis(10));
        w.tick().await.unwrap();

        let error = storage.get_job(id).await.unwrap().unwrap().error.unwrap();
        assert!(error.contains("[REDACTED_EMAIL]"), "got: {error}");
        assert!(!error.contains("bob@example.com"));
    }

    #[tokio::test]
    async fn run_drains_queue_and_stops_on_cancel() {
        let (storage, _dir) = storage().await;
        for i in 0..5 {
            storage
                .enqueue_job(&extract(&format!("c{i}")), 3)
                .await
                .unwrap();
        }
        let handler = ScriptedHandler::new(Script::Succeed);
        let w = Arc::new(worker(storage.clone(), handler.clone()));
        let token = CancellationToken::new();

        let task = {
            let w = w.clone();
            let token = token.clone();
            tokio::spawn(async move { w.run(token).await })
        };

        for _ in 0..200 {
            if storage.job_counts().await.unwrap().completed == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(storage.job_counts().await.unwrap().completed, 5);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
    }
}
