// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deep validators for the out-of-band sanitization stage.
//!
//! Both validators receive text the fast sanitizer already redacted and
//! report residual risk as a list of issue categories. They never rewrite
//! the text.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use lorekeep_core::types::{AdapterType, HealthStatus, ValidationReport};
use lorekeep_core::{DeepValidator, LorekeepError, PluginAdapter};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Issue category for street addresses.
pub const ISSUE_ADDRESS: &str = "address";
/// Issue category for US social security numbers.
pub const ISSUE_SSN: &str = "ssn";
/// Issue category for Luhn-valid card numbers.
pub const ISSUE_CREDIT_CARD: &str = "credit_card";
/// Issue category for `password = ...` style assignments.
pub const ISSUE_CREDENTIAL: &str = "credential";
/// Issue category for IPv6 addresses.
pub const ISSUE_IPV6: &str = "ipv6";
/// Issue category for e-mails written as `name [at] host [dot] com`.
pub const ISSUE_OBFUSCATED_EMAIL: &str = "obfuscated_email";
/// Issue category for loosely formatted phone numbers.
pub const ISSUE_PHONE: &str = "phone";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("validator pattern must compile")
}

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b\d{1,5}\s+(?:[A-Za-z0-9.'\-]+\s+){1,4}(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way|place|pl|terrace|parkway|pkwy)\b",
    )
});
static SSN: LazyLock<Regex> = LazyLock::new(|| compile(r"\b\d{3}-\d{2}-\d{4}\b"));
static CARD_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:\d[ \-]?){12,18}\d\b"));
static CREDENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)\b(?:password|passwd|pwd|secret|api[_\-]?key|access[_\-]?token|auth[_\-]?token|client[_\-]?secret)\s*[:=]\s*["']?[^\s"'\[]{4,}"#,
    )
});
static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:[0-9a-f]{1,4}:){7}[0-9a-f]{1,4}\b|\b(?:[0-9a-f]{1,4}:){1,6}:(?:[0-9a-f]{1,4}(?::[0-9a-f]{1,4}){0,5})?\b",
    )
});
static OBFUSCATED_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b[a-z0-9._%+\-]+\s*(?:\[at\]|\(at\)|\{at\}|\sat\s)\s*[a-z0-9\-]+(?:\s*(?:\[dot\]|\(dot\)|\{dot\}|\sdot\s)\s*[a-z0-9\-]+)+\b",
    )
});
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| compile(r"\+?\(?\d[\d \-.()]*\d"));

/// Local, higher-recall rule set run over already-redacted text.
///
/// Never fails. Issues are reported once each, in rule order.
#[derive(Debug, Default, Clone)]
pub struct PatternValidator;

impl PatternValidator {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`DeepValidator::validate`].
    pub fn check(&self, text: &str) -> ValidationReport {
        let mut issues: Vec<String> = Vec::new();
        let mut push = |issue: &str| {
            if !issues.iter().any(|i| i == issue) {
                issues.push(issue.to_string());
            }
        };

        if ADDRESS.is_match(text) {
            push(ISSUE_ADDRESS);
        }
        if SSN.is_match(text) {
            push(ISSUE_SSN);
        }
        if CARD_CANDIDATE
            .find_iter(text)
            .any(|m| luhn_valid(m.as_str()))
        {
            push(ISSUE_CREDIT_CARD);
        }
        if CREDENTIAL.is_match(text) {
            push(ISSUE_CREDENTIAL);
        }
        if IPV6.find_iter(text).any(|m| looks_like_ipv6(m.as_str())) {
            push(ISSUE_IPV6);
        }
        if OBFUSCATED_EMAIL.is_match(text) {
            push(ISSUE_OBFUSCATED_EMAIL);
        }
        if DIGIT_RUN.find_iter(text).any(|m| is_phone_like(m.as_str())) {
            push(ISSUE_PHONE);
        }

        ValidationReport::with_issues(issues)
    }
}

/// Luhn checksum over the digits of `candidate`, ignoring separators.
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// A separated digit run with as many digits as a phone number has.
/// Shorter runs are dates or SSNs, longer ones card or account numbers.
fn is_phone_like(run: &str) -> bool {
    let digits = run.chars().filter(char::is_ascii_digit).count();
    (10..=12).contains(&digits)
}

/// Filters out `12:30:` style times and `::` alone.
fn looks_like_ipv6(candidate: &str) -> bool {
    let groups = candidate.split(':').filter(|g| !g.is_empty()).count();
    groups >= 3 || (candidate.contains("::") && groups >= 2)
}

#[async_trait]
impl PluginAdapter for PatternValidator {
    fn name(&self) -> &str {
        "pattern"
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
impl DeepValidator for PatternValidator {
    async fn validate(&self, text: &str) -> Result<ValidationReport, LorekeepError> {
        Ok(self.check(text))
    }
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    text: &'a str,
}

/// Remote validator: POSTs `{"text": ...}` and expects a [`ValidationReport`].
///
/// Transport failures, non-success statuses and unreadable bodies are
/// returned as [`LorekeepError::Validator`] so the job is retried.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpValidator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LorekeepError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LorekeepError::Validator {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PluginAdapter for HttpValidator {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Validator
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeepError> {
        match self.validate("").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), LorekeepError> {
        Ok(())
    }
}

#[async_trait]
impl DeepValidator for HttpValidator {
    async fn validate(&self, text: &str) -> Result<ValidationReport, LorekeepError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ValidateRequest { text })
            .send()
            .await
            .map_err(|e| LorekeepError::Validator {
                message: format!("validator request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, endpoint = %self.endpoint, "validator responded");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LorekeepError::Validator {
                message: format!("validator returned {status}: {body}"),
                source: None,
            });
        }

        let report: ValidationReport =
            response.json().await.map_err(|e| LorekeepError::Validator {
                message: format!("failed to parse validator response: {e}"),
                source: Some(Box::new(e)),
            })?;

        // A dirty verdict without issues still has to be recorded as a finding.
        if !report.is_clean && report.issues.is_empty() {
            return Ok(ValidationReport {
                is_clean: false,
                issues: vec!["unspecified".to_string()],
            });
        }
        Ok(report)
    }
}
