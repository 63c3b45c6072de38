// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Unknown keys are reported by their dotted path (`queue.max_attempt`) with
//! a Jaro-Winkler suggestion. When the bad key came from a `LOREKEEP_*`
//! variable the suggestion is the variable to set instead, since a dotted
//! path is not what the operator typed.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::ENV_PREFIX;

/// Minimum Jaro-Winkler similarity for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Source name used for configuration given as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// A configuration error, rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(lorekeep::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path of the key, e.g. `queue.max_attempt`.
        key: String,
        /// A dotted path, or a `LOREKEEP_*` name for env-sourced keys.
        suggestion: Option<String>,
        /// Keys accepted where this one was found.
        valid_keys: String,
        #[label("not a lorekeep setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: found {found}, expected {expected}")]
    #[diagnostic(code(lorekeep::config::invalid_type))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but makes no sense, from `validation`.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(lorekeep::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(lorekeep::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys here: {valid_keys}"),
        None => format!("valid keys here: {valid_keys}"),
    }
}

/// Where a failing value was read from.
enum Origin {
    File(String),
    Env,
    Inline,
    Unknown,
}

impl Origin {
    fn of(error: &figment::Error) -> Self {
        let Some(metadata) = error.metadata.as_ref() else {
            return Origin::Unknown;
        };
        match &metadata.source {
            Some(figment::Source::File(path)) => Origin::File(path.display().to_string()),
            Some(figment::Source::Code(_)) => Origin::Inline,
            _ if metadata.name.contains("environment") => Origin::Env,
            _ => Origin::Unknown,
        }
    }

    /// The TOML text this origin refers to, if it was collected.
    fn source<'s>(&self, sources: &'s [(String, String)]) -> Option<(&'s str, &'s str)> {
        let wanted = match self {
            Origin::File(path) => path.as_str(),
            Origin::Inline => INLINE_SOURCE,
            Origin::Env | Origin::Unknown => return None,
        };
        sources
            .iter()
            .find(|(name, _)| name == wanted)
            .map(|(name, content)| (name.as_str(), content.as_str()))
    }
}

/// Convert a `figment::Error` (possibly several) into diagnostics.
///
/// `toml_sources` pairs a file path (or [`INLINE_SOURCE`]) with its content
/// so spans can be attached.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let origin = Origin::of(&error);
            let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    unknown_key(&origin, &section, field, expected, toml_sources)
                }
                Kind::InvalidType(found, expected) => {
                    // The path ends with the offending key itself.
                    let (field, table) = match section.split_last() {
                        Some((field, table)) => (field.as_str(), table),
                        None => ("", &[][..]),
                    };
                    let (span, src) = locate(&origin, table, field, toml_sources);
                    ConfigError::InvalidType {
                        key: section.join("."),
                        found: found.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn unknown_key(
    origin: &Origin,
    section: &[String],
    field: &str,
    expected: &[&str],
    toml_sources: &[(String, String)],
) -> ConfigError {
    let mut key_path = section.to_vec();
    key_path.push(field.to_string());

    let suggested_path = if section.is_empty() {
        // Top-level keys are section names. An env key that missed every
        // section arrives whole (`queu_max_attempts`).
        field
            .split_once('_')
            .and_then(|(head, rest)| {
                suggest_key(head, expected).map(|s| vec![s, rest.to_string()])
            })
            .or_else(|| suggest_key(field, expected).map(|s| vec![s]))
    } else {
        suggest_key(field, expected).map(|s| {
            let mut path = section.to_vec();
            path.push(s);
            path
        })
    };
    let suggestion = suggested_path.map(|path| match origin {
        Origin::Env => format!("{ENV_PREFIX}{}", path.join("_").to_ascii_uppercase()),
        _ => path.join("."),
    });

    let (span, src) = locate(origin, section, field, toml_sources);
    ConfigError::UnknownKey {
        key: key_path.join("."),
        suggestion,
        valid_keys: expected.join(", "),
        span,
        src,
    }
}

fn locate(
    origin: &Origin,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, content)) = origin.source(toml_sources) else {
        return (None, None);
    };
    match find_key_offset(content, section.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.to_string())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside `[section]` (or at top level for `None`).
///
/// Tracks table headers line by line, so a key of the same name in another
/// table is never matched. A top-level dotted key (`queue.max_attempt = 4`)
/// also counts; the offset then points at the part after the dot.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let dotted = section.map(|s| format!("{s}.{field}"));
    let mut table: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            table = header.split(']').next().map(str::trim);
        } else if let Some(key) = assigned_key(trimmed) {
            if table == section && key == field {
                return Some(offset + indent);
            }
            if table.is_none() && dotted.as_deref() == Some(key) {
                return Some(offset + indent + key.len() - field.len());
            }
        }
        offset += line.len();
    }
    None
}

/// The key on a `key = value` line, or `None` for comments and blanks.
fn assigned_key(line: &str) -> Option<&str> {
    if line.starts_with('#') {
        return None;
    }
    let (key, _) = line.split_once('=')?;
    let key = key.trim_end();
    (!key.is_empty()).then_some(key)
}

/// The closest of `valid_keys` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render every error with miette's graphical handler.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = miette::GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => out.push_str(&buf),
            Err(_) => out.push_str(&format!("Error: {error}\n")),
        }
    }
    out
}

/// Render every error to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_max_attempts_for_typo() {
        let valid = &["max_attempts", "stalled_after_secs"];
        assert_eq!(
            suggest_key("max_attempt", valid),
            Some("max_attempts".to_string())
        );
    }

    #[test]
    fn suggest_section_name() {
        let sections = &["log", "storage", "queue", "worker", "validator"];
        assert_eq!(suggest_key("queu", sections), Some("queue".to_string()));
        assert_eq!(suggest_key("zzzzzz", sections), None);
    }

    #[test]
    fn key_offset_in_section() {
        let content = "[log]\nlevel = \"info\"\n\n[queue]\nmax_attempt = 4\n";
        let o = find_key_offset(content, Some("queue"), "max_attempt").unwrap();
        assert_eq!(&content[o..o + 11], "max_attempt");
    }

    #[test]
    fn key_offset_ignores_same_key_in_later_table() {
        let content = "[log]\nlevel = \"debug\"\n[worker]\nlevel = 1\n";
        let o = find_key_offset(content, Some("log"), "level").unwrap();
        assert!(o < content.find("[worker]").unwrap());
        assert_eq!(find_key_offset(content, Some("queue"), "level"), None);
    }

    #[test]
    fn key_offset_handles_crlf_and_dotted_keys() {
        let content = "# settings\r\n[queue]\r\nmax_attempt = 4\r\n";
        let o = find_key_offset(content, Some("queue"), "max_attempt").unwrap();
        assert_eq!(&content[o..o + 11], "max_attempt");

        let dotted = "queue.max_attempt = 4\n";
        let o = find_key_offset(dotted, Some("queue"), "max_attempt").unwrap();
        assert_eq!(&dotted[o..], "max_attempt = 4\n");
    }

    #[test]
    fn top_level_key_offset() {
        let content = "telemetry = true\n[log]\n";
        assert_eq!(find_key_offset(content, None, "telemetry"), Some(0));
    }

    #[test]
    fn report_contains_help() {
        let errors = vec![ConfigError::UnknownKey {
            key: "queue.max_attempt".to_string(),
            suggestion: Some("queue.max_attempts".to_string()),
            valid_keys: "max_attempts, stalled_after_secs".to_string(),
            span: None,
            src: None,
        }];
        let report = render_report(&errors);
        assert!(report.contains("queue.max_attempt"));
        assert!(report.contains("did you mean `queue.max_attempts`"));
    }
}
