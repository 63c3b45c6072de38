// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock deep validator with scripted verdicts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use lorekeep_core::traits::{DeepValidator, PluginAdapter};
use lorekeep_core::types::{AdapterType, HealthStatus, ValidationReport};
use lorekeep_core::LorekeepError;

/// A deep validator that returns queued reports and records what it saw.
///
/// With an empty queue every text is reported clean.
pub struct MockValidator {
    reports: Mutex<VecDeque<ValidationReport>>,
    seen: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::with_reports(Vec::new())
    }

    /// Reports returned in order, one per call.
    pub fn with_reports(reports: Vec<ValidationReport>) -> Self {
        Self {
            reports: Mutex::new(VecDeque::from(reports)),
            seen: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// A validator whose every call fails as if the service were down.
    pub fn unavailable() -> Self {
        let validator = Self::new();
        validator.set_unavailable(true);
        validator
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Texts passed to `validate`, in call order.
    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

impl Default for MockValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockValidator {
    fn name(&self) -> &str {
        "mock-validator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Validator
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeepError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LorekeepError> {
        Ok(())
    }
}

#[async_trait]
impl DeepValidator for MockValidator {
    async fn validate(&self, text: &str) -> Result<ValidationReport, LorekeepError> {
        self.seen.lock().await.push(text.to_string());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LorekeepError::Validator {
                message: "mock validator unavailable".into(),
                source: None,
            });
        }
        Ok(self
            .reports
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(ValidationReport::clean))
    }
}
