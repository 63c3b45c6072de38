// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fast, synchronous sanitizer applied to every text before it is stored.
//!
//! Rules run in a fixed order, each replacing its matches with a category
//! placeholder. Placeholders only contain `[`, `]`, upper-case letters and
//! `_`, and no rule matches inside one. The rule set is re-applied until
//! nothing matches; every changing pass removes at least one original
//! character, so the loop terminates.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder for credentials and key material.
pub const SECRET_PLACEHOLDER: &str = "[REDACTED_SECRET]";
/// Placeholder for e-mail addresses.
pub const EMAIL_PLACEHOLDER: &str = "[REDACTED_EMAIL]";
/// Placeholder for IPv4 addresses.
pub const IP_PLACEHOLDER: &str = "[REDACTED_IP]";
/// Placeholder for phone numbers.
pub const PHONE_PLACEHOLDER: &str = "[REDACTED_PHONE]";
/// Placeholder for home directory paths.
pub const PATH_PLACEHOLDER: &str = "[REDACTED_PATH]";

/// A single redaction rule.
struct Rule {
    category: &'static str,
    pattern: Regex,
    placeholder: &'static str,
}

fn rule(category: &'static str, pattern: &str, placeholder: &'static str) -> Rule {
    Rule {
        category,
        // Patterns are literals in this file; a failure here is a programming error.
        pattern: Regex::new(pattern).expect("sanitizer pattern must compile"),
        placeholder,
    }
}

/// Ordered rule set. Secrets come first so that a token containing an
/// e-mail-like or digit-heavy run is removed whole.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Anthropic API keys: sk-ant-api03-...
        rule("secret", r"sk-ant-[a-zA-Z0-9_\-]{20,}", SECRET_PLACEHOLDER),
        // Generic secret keys: sk-... (OpenAI style)
        rule("secret", r"sk-[a-zA-Z0-9]{20,}", SECRET_PLACEHOLDER),
        rule("secret", r"Bearer\s+[a-zA-Z0-9._\-]{10,}", SECRET_PLACEHOLDER),
        // Telegram bot tokens: 123456789:ABCdefGHI-zyx57W2v1u123ew11
        rule("secret", r"\d{8,10}:[a-zA-Z0-9_\-]{35}", SECRET_PLACEHOLDER),
        rule("secret", r"AKIA[0-9A-Z]{16}", SECRET_PLACEHOLDER),
        rule(
            "secret",
            r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----",
            SECRET_PLACEHOLDER,
        ),
        rule(
            "email",
            r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}",
            EMAIL_PLACEHOLDER,
        ),
        rule("ip", r"\b(?:\d{1,3}\.){3}\d{1,3}\b", IP_PLACEHOLDER),
        rule(
            "phone",
            r"(?:\+\d{1,3}[\-.\s]?)?(?:\(\d{3}\)|\b\d{3})[\-.\s]?\d{3}[\-.\s]?\d{4}\b",
            PHONE_PLACEHOLDER,
        ),
        rule(
            "path",
            r"(?:/home/|/Users/|[A-Za-z]:\\Users\\)[A-Za-z0-9._\-]+",
            PATH_PLACEHOLDER,
        ),
    ]
});

/// Redact secrets and personal data from `text`.
///
/// Pure and total: any input yields an output in which no rule matches.
/// Sanitizing an already sanitized text returns it unchanged.
pub fn sanitize(text: &str) -> String {
    let mut current = apply_rules(text);
    loop {
        let next = apply_rules(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether `text` contains nothing any rule would redact.
pub fn is_sanitized(text: &str) -> bool {
    !RULES.iter().any(|r| r.pattern.is_match(text))
}

/// Categories of every rule that matches `text`, deduplicated, in rule order.
pub fn matched_categories(text: &str) -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for r in RULES.iter() {
        if !categories.contains(&r.category) && r.pattern.is_match(text) {
            categories.push(r.category);
        }
    }
    categories
}

fn apply_rules(text: &str) -> String {
    let mut result = text.to_string();
    for r in RULES.iter() {
        if r.pattern.is_match(&result) {
            result = r.pattern.replace_all(&result, r.placeholder).into_owned();
        }
    }
    result
}
