// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lorekeep worker` command implementation.
//!
//! Wires storage, the deep validator and the extraction strategy into
//! [`Worker`]s, runs them until a shutdown signal arrives, then closes the
//! store.

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use lorekeep_anthropic::AnthropicProvider;
use lorekeep_config::model::{LorekeepConfig, ValidatorConfig};
use lorekeep_config::ValidatorKind;
use lorekeep_core::{DeepValidator, LorekeepError, ProviderAdapter, StorageAdapter};
use lorekeep_learning::strategy_from_config;
use lorekeep_sanitize::{HttpValidator, PatternValidator};
use lorekeep_worker::{install_signal_handler, LearningHandler, SanitizationHandler, Worker};
use tracing::{error, info, warn};

/// Which workers this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkerRole {
    /// `sanitize_async` and `deep_validate` jobs.
    Sanitize,
    /// `extract` jobs.
    Learn,
    /// Both.
    All,
}

impl WorkerRole {
    fn sanitizes(self) -> bool {
        matches!(self, WorkerRole::Sanitize | WorkerRole::All)
    }

    fn learns(self) -> bool {
        matches!(self, WorkerRole::Learn | WorkerRole::All)
    }
}

/// Run the selected workers until SIGINT/SIGTERM.
pub async fn run_worker(config: &LorekeepConfig, role: WorkerRole) -> Result<(), LorekeepError> {
    let storage = crate::open_storage(config).await?;
    let workers = build_workers(config, storage.clone(), role)?;

    let cancel = install_signal_handler();
    info!(
        workers = workers.len(),
        poll_interval_ms = config.worker.poll_interval_ms,
        "lorekeep workers running"
    );

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "worker task aborted");
        }
    }

    storage.close().await?;
    info!("lorekeep workers stopped");
    Ok(())
}

fn build_workers(
    config: &LorekeepConfig,
    storage: Arc<dyn StorageAdapter>,
    role: WorkerRole,
) -> Result<Vec<Worker>, LorekeepError> {
    let poll_interval = Duration::from_millis(config.worker.poll_interval_ms);
    let mut workers = Vec::new();

    if role.sanitizes() {
        let validator = build_validator(&config.validator)?;
        info!(validator = validator.name(), "sanitization worker enabled");
        let handler = SanitizationHandler::new(storage.clone(), validator);
        workers.push(Worker::new(storage.clone(), Arc::new(handler), poll_interval));
    }

    if role.learns() {
        let strategy = strategy_from_config(&config.extraction, build_provider(config));
        let handler = LearningHandler::new(storage.clone(), strategy);
        workers.push(Worker::new(storage, Arc::new(handler), poll_interval));
    }

    Ok(workers)
}

/// The deep validator selected by `[validator]`.
pub(crate) fn build_validator(
    config: &ValidatorConfig,
) -> Result<Arc<dyn DeepValidator>, LorekeepError> {
    match config.kind {
        ValidatorKind::Pattern => Ok(Arc::new(PatternValidator::new())),
        ValidatorKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                LorekeepError::Config("validator.endpoint is required for http".to_string())
            })?;
            Ok(Arc::new(HttpValidator::new(
                endpoint,
                Duration::from_secs(config.timeout_secs),
            )?))
        }
    }
}

/// The reasoning provider, when reasoning extraction is enabled and an API
/// key can be found. Without one the heuristic strategy is used.
fn build_provider(config: &LorekeepConfig) -> Option<Arc<dyn ProviderAdapter>> {
    if !config.extraction.reasoning_enabled {
        return None;
    }
    match AnthropicProvider::new(&config.anthropic) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "reasoning provider unavailable, falling back to heuristic extraction");
            None
        }
    }
}
