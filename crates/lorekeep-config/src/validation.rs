// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a usable database path, positive attempt limits, and an endpoint
//! for the HTTP validator.

use crate::diagnostic::ConfigError;
use crate::model::{LorekeepConfig, ValidatorKind};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LorekeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(key) = &config.storage.encryption_key
        && key.is_empty()
    {
        fail("storage.encryption_key must not be empty when set".to_string());
    }

    if config.queue.max_attempts < 1 {
        fail(format!(
            "queue.max_attempts must be at least 1, got {}",
            config.queue.max_attempts
        ));
    }

    if config.queue.stalled_after_secs == 0 {
        fail("queue.stalled_after_secs must be greater than 0".to_string());
    }

    if config.worker.poll_interval_ms == 0 {
        fail("worker.poll_interval_ms must be greater than 0".to_string());
    }

    if config.validator.kind == ValidatorKind::Http {
        match config.validator.endpoint.as_deref().map(str::trim) {
            None | Some("") => {
                fail("validator.endpoint is required when validator.kind = \"http\"".to_string())
            }
            Some(endpoint) if !is_http_url(endpoint) => fail(format!(
                "validator.endpoint `{endpoint}` must start with http:// or https://"
            )),
            Some(_) => {}
        }
    }

    if config.validator.timeout_secs == 0 {
        fail("validator.timeout_secs must be greater than 0".to_string());
    }

    if config.extraction.reasoning_enabled && config.extraction.model.trim().is_empty() {
        fail("extraction.model must not be empty when reasoning is enabled".to_string());
    }

    if config.extraction.max_tokens == 0 {
        fail("extraction.max_tokens must be greater than 0".to_string());
    }

    if !is_http_url(config.anthropic.base_url.trim()) {
        fail(format!(
            "anthropic.base_url `{}` must start with http:// or https://",
            config.anthropic.base_url
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
