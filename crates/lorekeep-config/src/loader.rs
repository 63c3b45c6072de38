// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lorekeep.toml` > `~/.config/lorekeep/lorekeep.toml` > `/etc/lorekeep/lorekeep.toml`
//! with environment variable overrides via `LOREKEEP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LorekeepConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lorekeep/lorekeep.toml` (system-wide)
/// 3. `~/.config/lorekeep/lorekeep.toml` (user XDG config)
/// 4. `./lorekeep.toml` (local directory)
/// 5. `LOREKEEP_*` environment variables
pub fn load_config() -> Result<LorekeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LorekeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LorekeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
///
/// Used by `lorekeep --config <path>`; the XDG files are skipped.
pub fn load_config_from_path(path: &Path) -> Result<LorekeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LorekeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LorekeepConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "LOREKEEP_";

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/lorekeep/lorekeep.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lorekeep.toml";

/// Per-user config file under the platform config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lorekeep/lorekeep.toml"))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `LOREKEEP_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| map_env_key(key.as_str()).into())
}

/// Section prefixes recognized in environment variable names.
const ENV_SECTIONS: &[&str] = &[
    "log",
    "storage",
    "queue",
    "worker",
    "validator",
    "extraction",
    "anthropic",
];

/// Map a prefix-stripped env var name to a dotted config key.
///
/// Figment passes the name as written (`QUEUE_MAX_ATTEMPTS`), so it is
/// lowercased first. Only the first underscore after a known section name
/// becomes a dot. Names without a known section are returned lowercased and
/// rejected later as unknown keys.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
