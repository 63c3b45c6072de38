// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deep validator trait for the out-of-band sanitization stage.

use async_trait::async_trait;

use crate::error::LorekeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ValidationReport;

/// A higher-recall check run against content the fast sanitizer already redacted.
///
/// Finding issues is an ordinary result (`is_clean == false`). Only transport
/// or availability failures are returned as errors; the sanitization worker
/// turns those into retryable job failures.
#[async_trait]
pub trait DeepValidator: PluginAdapter {
    async fn validate(&self, text: &str) -> Result<ValidationReport, LorekeepError>;
}
