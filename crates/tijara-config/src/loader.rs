// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tijara.toml` > `~/.config/tijara/tijara.toml` > `/etc/tijara/tijara.toml`
//! with environment variable overrides via the `TIJARA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TijaraConfig;

/// Names a single config file to load instead of the standard hierarchy.
pub const CONFIG_PATH_VAR: &str = "TIJARA_CONFIG";

/// Display name used for diagnostics on TOML passed as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// Sections addressable from environment variables, longest first so that
/// `patterns_` is never shadowed by a shorter prefix.
const ENV_SECTIONS: &[&str] = &[
    "orchestrator",
    "patterns",
    "gemini",
    "orders",
    "agent",
    "pool",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tijara/tijara.toml` (system-wide)
/// 3. `~/.config/tijara/tijara.toml` (user XDG config)
/// 4. `./tijara.toml` (local directory)
/// 5. `TIJARA_*` environment variables
pub fn load_config() -> Result<TijaraConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TijaraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TijaraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TijaraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TijaraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Standard config files, lowest precedence first.
pub fn standard_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tijara/tijara.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tijara/tijara.toml"));
    }
    paths.push(PathBuf::from("tijara.toml"));
    paths
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    standard_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(TijaraConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Maps a prefix-stripped, lowercased env key to its dotted config path.
///
/// Only the section prefix is split off: `pool_max_attempts` becomes
/// `pool.max_attempts`, never `pool.max.attempts`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}

/// `TIJARA_*` overrides. `TIJARA_CONFIG` selects the file and is not a key.
fn env_provider() -> Env {
    Env::prefixed("TIJARA_")
        .ignore(&["config"])
        .map(|key| map_env_key(key.as_str()).into())
}
