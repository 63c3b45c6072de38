// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Lorekeep.

use thiserror::Error;

/// The primary error type used across all Lorekeep adapter traits and core operations.
#[derive(Debug, Error)]
pub enum LorekeepError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Reasoning provider errors (API failure, unavailable endpoint).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Deep validator errors (transport failure, unavailable validator).
    #[error("validator error: {message}")]
    Validator {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A job payload did not decode into the shape its job type requires.
    #[error("malformed {job_type} payload: {message}")]
    MalformedPayload { job_type: String, message: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LorekeepError {
    /// Wraps any error as a storage error.
    pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        LorekeepError::Storage {
            source: Box::new(e),
        }
    }
}
