// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redaction for log output and error messages.
//!
//! Two complementary mechanisms:
//! 1. **Rule-based**: the fast sanitizer's rule set (keys, tokens, e-mails,
//!    addresses, phone numbers, home paths).
//! 2. **Exact-match**: configured values known at runtime (API keys, the
//!    database key) that no pattern would recognize.

use std::io::Write;
use std::sync::{Arc, RwLock};

use crate::fast::{sanitize, SECRET_PLACEHOLDER};

/// Shared list of exact values to hide from output.
pub type SecretValues = Arc<RwLock<Vec<String>>>;

/// Redact `input` with the sanitizer rules and the given exact values.
///
/// Exact values are replaced longest first so that a value containing
/// another is removed whole.
pub fn redact(input: &str, exact_values: &[String]) -> String {
    let mut sorted: Vec<&String> = exact_values.iter().filter(|v| !v.is_empty()).collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));

    let mut result = input.to_string();
    for value in sorted {
        result = result.replace(value.as_str(), SECRET_PLACEHOLDER);
    }

    sanitize(&result)
}

/// A writer wrapper that redacts everything written through it.
///
/// Installed as the tracing writer so log lines never carry secrets or
/// personal data, whatever a log statement interpolates.
pub struct RedactingWriter<W> {
    inner: W,
    exact_values: SecretValues,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, exact_values: SecretValues) -> Self {
        Self {
            inner,
            exact_values,
        }
    }

    /// Add a value to the exact-match list, ignoring empties and duplicates.
    pub fn add_secret(exact_values: &SecretValues, value: String) {
        if value.is_empty() {
            return;
        }
        if let Ok(mut values) = exact_values.write()
            && !values.contains(&value)
        {
            values.push(value);
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let values = self
            .exact_values
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        let redacted = redact(&input, &values);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
