// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the capture path and both workers over a temp
//! SQLite database with mock adapters. `capture()` feeds one input line
//! through ingestion and `drain()` runs the workers until the queue is quiet.

use std::sync::Arc;
use std::time::Duration;

use lorekeep_config::model::{LorekeepConfig, StorageConfig};
use lorekeep_core::types::ValidationReport;
use lorekeep_core::{LorekeepError, ProviderAdapter, StorageAdapter};
use lorekeep_ingest::CaptureSummary;
use lorekeep_learning::strategy_from_config;
use lorekeep_storage::SqliteStorage;
use lorekeep_worker::{LearningHandler, SanitizationHandler, Tick, Worker};

use crate::mock_provider::MockProvider;
use crate::mock_validator::MockValidator;

/// Upper bound on ticks per `drain()`, so a handler that keeps re-raising
/// work cannot hang a test.
const MAX_DRAIN_TICKS: usize = 1_000;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    validator_reports: Vec<ValidationReport>,
    reasoning_responses: Option<Vec<String>>,
    max_attempts: i32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            validator_reports: Vec::new(),
            reasoning_responses: None,
            max_attempts: 3,
        }
    }

    /// Scripted deep validator verdicts, returned in order.
    pub fn with_validator_reports(mut self, reports: Vec<ValidationReport>) -> Self {
        self.validator_reports = reports;
        self
    }

    /// Enable reasoning extraction with the given provider replies.
    pub fn with_reasoning(mut self, responses: Vec<String>) -> Self {
        self.reasoning_responses = Some(responses);
        self
    }

    /// Attempts allowed per job before it is dead-lettered.
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Build the test harness over a fresh temp database.
    pub async fn build(self) -> Result<TestHarness, LorekeepError> {
        let temp_dir = tempfile::TempDir::new().map_err(LorekeepError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = LorekeepConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        config.queue.max_attempts = self.max_attempts;
        config.worker.poll_interval_ms = 10;
        config.extraction.reasoning_enabled = self.reasoning_responses.is_some();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;

        Ok(TestHarness {
            storage: Arc::new(storage),
            validator: Arc::new(MockValidator::with_reports(self.validator_reports)),
            provider: Arc::new(MockProvider::with_responses(
                self.reasoning_responses.unwrap_or_default(),
            )),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Deep validator used by the sanitization worker.
    pub validator: Arc<MockValidator>,
    /// Reasoning provider, consulted only when reasoning is enabled.
    pub provider: Arc<MockProvider>,
    pub config: LorekeepConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Feed one capture line through ingestion, as `lorekeep capture` does.
    pub async fn capture(&self, line: &str) -> Option<CaptureSummary> {
        lorekeep_ingest::capture_line(self.storage.as_ref(), line, self.config.queue.max_attempts)
            .await
    }

    pub fn sanitization_worker(&self) -> Worker {
        let storage: Arc<dyn StorageAdapter> = self.storage.clone();
        let handler = SanitizationHandler::new(storage.clone(), self.validator.clone());
        Worker::new(storage, Arc::new(handler), self.poll_interval())
    }

    pub fn learning_worker(&self) -> Worker {
        let storage: Arc<dyn StorageAdapter> = self.storage.clone();
        let provider: Arc<dyn ProviderAdapter> = self.provider.clone();
        let strategy = strategy_from_config(&self.config.extraction, Some(provider));
        let handler = LearningHandler::new(storage.clone(), strategy);
        Worker::new(storage, Arc::new(handler), self.poll_interval())
    }

    /// Run both workers until neither finds a job, returning every
    /// non-idle tick in order.
    pub async fn drain(&self) -> Result<Vec<Tick>, LorekeepError> {
        let workers = [self.sanitization_worker(), self.learning_worker()];
        let mut ticks = Vec::new();

        for _ in 0..MAX_DRAIN_TICKS {
            let mut busy = false;
            for worker in &workers {
                let tick = worker.tick().await?;
                if tick != Tick::Idle {
                    busy = true;
                    ticks.push(tick);
                }
            }
            if !busy {
                return Ok(ticks);
            }
        }

        Err(LorekeepError::Internal(format!(
            "queue not drained after {MAX_DRAIN_TICKS} rounds"
        )))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.worker.poll_interval_ms)
    }
}
