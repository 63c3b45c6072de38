// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Lorekeep.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Lorekeep configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LorekeepConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Worker poll loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Deep validator selection.
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Learning extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Anthropic API settings for the reasoning strategy.
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// SQLCipher key. `None` leaves the database unencrypted.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            encryption_key: None,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lorekeep").join("lorekeep.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lorekeep.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Job queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Attempts a job gets before it is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,

    /// Age after which an `in_progress` job is reported as stalled.
    #[serde(default = "default_stalled_after_secs")]
    pub stalled_after_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            stalled_after_secs: default_stalled_after_secs(),
        }
    }
}

fn default_max_attempts() -> i32 {
    3
}

fn default_stalled_after_secs() -> u64 {
    600
}

/// Worker poll loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Sleep between polls when the queue is empty or a job failed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

/// Which deep validator the sanitization worker uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Local rule-based validator.
    #[default]
    Pattern,
    /// Remote validator reached over HTTP.
    Http,
}

/// Deep validator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub kind: ValidatorKind,

    /// Endpoint for the HTTP validator. Required when `kind = "http"`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout for the HTTP validator.
    #[serde(default = "default_validator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            kind: ValidatorKind::default(),
            endpoint: None,
            timeout_secs: default_validator_timeout_secs(),
        }
    }
}

fn default_validator_timeout_secs() -> u64 {
    10
}

/// Learning extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Use the reasoning provider. Falls back to the heuristic when no
    /// provider can be built.
    #[serde(default)]
    pub reasoning_enabled: bool,

    /// Model used for reasoning extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens the provider may generate per extraction.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            reasoning_enabled: false,
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Base URL of the Messages API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: default_api_version(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_kind_parses_lowercase() {
        let config: LorekeepConfig = toml::from_str("[validator]\nkind = \"http\"\n").unwrap();
        assert_eq!(config.validator.kind, ValidatorKind::Http);
    }

    #[test]
    fn unknown_validator_kind_is_rejected() {
        let result = toml::from_str::<LorekeepConfig>("[validator]\nkind = \"oracle\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn default_database_path_ends_with_db_file() {
        assert!(StorageConfig::default().database_path.ends_with("lorekeep.db"));
    }
}
