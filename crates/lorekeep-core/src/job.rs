// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed job payloads.
//!
//! Every job type has exactly one payload shape. Decoding is keyed by the
//! job's type tag and fails closed with [`LorekeepError::MalformedPayload`]
//! when the stored JSON does not match that shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LorekeepError;
use crate::types::JobType;

/// Payload of a `sanitize_async` job, raised when a message is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SanitizeAsyncPayload {
    pub message_id: String,
    pub conversation_id: String,
    pub sequence: i64,
    #[serde(rename = "created_at")]
    pub created_at: String,
}

/// Payload of a `deep_validate` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeepValidatePayload {
    pub message_id: String,
}

/// Payload of an `extract` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtractPayload {
    pub conversation_id: String,
}

/// A job payload, discriminated by the job's type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    SanitizeAsync(SanitizeAsyncPayload),
    DeepValidate(DeepValidatePayload),
    Extract(ExtractPayload),
}

impl JobPayload {
    /// The type tag this payload is stored under.
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::SanitizeAsync(_) => JobType::SanitizeAsync,
            JobPayload::DeepValidate(_) => JobType::DeepValidate,
            JobPayload::Extract(_) => JobType::Extract,
        }
    }

    /// Serialize the payload body (without the type tag).
    pub fn to_json(&self) -> Result<String, LorekeepError> {
        let encoded = match self {
            JobPayload::SanitizeAsync(p) => serde_json::to_string(p),
            JobPayload::DeepValidate(p) => serde_json::to_string(p),
            JobPayload::Extract(p) => serde_json::to_string(p),
        };
        encoded.map_err(|e| LorekeepError::Internal(format!("failed to encode job payload: {e}")))
    }

    /// Decode a stored payload using the decoder for `job_type`.
    pub fn decode(job_type: &str, payload: &str) -> Result<Self, LorekeepError> {
        let kind: JobType = job_type.parse().map_err(|_| LorekeepError::MalformedPayload {
            job_type: job_type.to_string(),
            message: "unknown job type".to_string(),
        })?;
        match kind {
            JobType::SanitizeAsync => decode_body(kind, payload).map(JobPayload::SanitizeAsync),
            JobType::DeepValidate => decode_body(kind, payload).map(JobPayload::DeepValidate),
            JobType::Extract => decode_body(kind, payload).map(JobPayload::Extract),
        }
    }

    /// The message a sanitization payload refers to.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            JobPayload::SanitizeAsync(p) => Some(&p.message_id),
            JobPayload::DeepValidate(p) => Some(&p.message_id),
            JobPayload::Extract(_) => None,
        }
    }

    /// The conversation a payload refers to, when it names one.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            JobPayload::SanitizeAsync(p) => Some(&p.conversation_id),
            JobPayload::DeepValidate(_) => None,
            JobPayload::Extract(p) => Some(&p.conversation_id),
        }
    }
}

fn decode_body<T: DeserializeOwned>(kind: JobType, payload: &str) -> Result<T, LorekeepError> {
    serde_json::from_str(payload).map_err(|e| LorekeepError::MalformedPayload {
        job_type: kind.as_str().to_string(),
        message: e.to_string(),
    })
}
