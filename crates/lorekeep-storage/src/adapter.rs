// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use lorekeep_config::model::StorageConfig;
use lorekeep_core::types::{
    Conversation, Job, JobCounts, JobStatus, Learning, LearningDraft, Message, NewMessage,
    SanitizationFinding, StoreCounts,
};
use lorekeep_core::{AdapterType, HealthStatus, LorekeepError, PluginAdapter, StorageAdapter};

use crate::database::{Database, DatabaseOptions};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates every operation to the query
/// modules. The database is opened by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, LorekeepError> {
        self.db.get().ok_or_else(|| LorekeepError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeepError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LorekeepError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), LorekeepError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, DatabaseOptions::from(&self.config)).await?;
        self.db.set(db).map_err(|_| LorekeepError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LorekeepError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Conversations ---

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, LorekeepError> {
        queries::conversations::get_conversation(self.database()?, id).await
    }

    async fn find_conversation(
        &self,
        correlation_key: &str,
    ) -> Result<Option<Conversation>, LorekeepError> {
        queries::conversations::find_conversation(self.database()?, correlation_key).await
    }

    async fn list_conversations(&self, limit: i64) -> Result<Vec<Conversation>, LorekeepError> {
        queries::conversations::list_conversations(self.database()?, limit).await
    }

    // --- Messages ---

    async fn append_message(&self, message: &NewMessage) -> Result<Message, LorekeepError> {
        queries::messages::append_message(self.database()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, LorekeepError> {
        queries::messages::get_message(self.database()?, id).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, LorekeepError> {
        queries::messages::get_messages(self.database()?, conversation_id).await
    }

    // --- Job queue ---

    async fn enqueue(
        &self,
        job_type: &str,
        payload: &str,
        max_attempts: i32,
    ) -> Result<i64, LorekeepError> {
        queries::jobs::enqueue(self.database()?, job_type, payload, max_attempts).await
    }

    async fn dequeue(&self, job_type: &str) -> Result<Option<Job>, LorekeepError> {
        queries::jobs::dequeue(self.database()?, job_type).await
    }

    async fn mark_completed(&self, id: i64) -> Result<(), LorekeepError> {
        if !queries::jobs::mark_completed(self.database()?, id).await? {
            debug!(job_id = id, "mark_completed ignored: job not in progress");
        }
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> Result<Option<JobStatus>, LorekeepError> {
        queries::jobs::mark_failed(self.database()?, id, error).await
    }

    async fn get_job(&self, id: i64) -> Result<Option<Job>, LorekeepError> {
        queries::jobs::get_job(self.database()?, id).await
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<Job>, LorekeepError> {
        queries::jobs::list_jobs(self.database()?, status, limit).await
    }

    async fn job_counts(&self) -> Result<JobCounts, LorekeepError> {
        queries::jobs::job_counts(self.database()?).await
    }

    async fn requeue_dead_letter(&self, id: i64) -> Result<bool, LorekeepError> {
        queries::jobs::requeue_dead_letter(self.database()?, id).await
    }

    async fn list_stalled(&self, older_than: Duration) -> Result<Vec<Job>, LorekeepError> {
        queries::jobs::list_stalled(self.database()?, older_than).await
    }

    // --- Sanitization findings ---

    async fn record_finding(
        &self,
        message_id: &str,
        issues: &[String],
    ) -> Result<SanitizationFinding, LorekeepError> {
        queries::findings::record_finding(self.database()?, message_id, issues).await
    }

    async fn get_finding(
        &self,
        message_id: &str,
    ) -> Result<Option<SanitizationFinding>, LorekeepError> {
        queries::findings::get_finding(self.database()?, message_id).await
    }

    // --- Learnings ---

    async fn insert_learning(
        &self,
        conversation_id: &str,
        draft: &LearningDraft,
    ) -> Result<Learning, LorekeepError> {
        queries::learnings::insert_learning(self.database()?, conversation_id, draft).await
    }

    async fn list_learnings(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<Learning>, LorekeepError> {
        queries::learnings::list_learnings(self.database()?, conversation_id).await
    }

    async fn store_counts(&self) -> Result<StoreCounts, LorekeepError> {
        queries::conversations::store_counts(self.database()?).await
    }
}
