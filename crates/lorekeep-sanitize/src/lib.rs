// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-stage sanitization for Lorekeep.
//!
//! The fast stage ([`fast::sanitize`]) runs synchronously before anything is
//! stored. The deep stage ([`deep`]) runs later, from a queued job, and
//! reports residual risk without rewriting content. [`redact`] reuses the
//! fast rules to keep log output clean.

pub mod deep;
pub mod fast;
pub mod redact;

pub use deep::{HttpValidator, PatternValidator};
pub use fast::{is_sanitized, sanitize};
pub use redact::{redact, RedactingWriter, SecretValues};
