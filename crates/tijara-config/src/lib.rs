// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Tijara response engine.
//!
//! A [`ConfigSource`] names where the TOML comes from. [`load`] layers it
//! over compiled defaults, applies `TIJARA_*` environment overrides (except
//! for inline sources), validates every section and checks that each
//! `[[credentials]]` entry converts into a pool credential. All problems are
//! returned together as miette diagnostics.
//!
//! ```no_run
//! use tijara_config::{ConfigSource, load, render};
//!
//! let config = match load(ConfigSource::from_env()) {
//!     Ok(config) => config,
//!     Err(errors) => panic!("{}", render(&errors)),
//! };
//! println!("max attempts: {}", config.pool.max_attempts);
//! ```

use std::path::{Path, PathBuf};

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render};
pub use loader::{CONFIG_PATH_VAR, load_config_from_path, load_config_from_str};
pub use model::TijaraConfig;

/// Where [`load`] reads TOML from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// `/etc/tijara`, the user config dir and `./tijara.toml`, merged in that order.
    Standard,
    /// One file, typically named by `TIJARA_CONFIG`.
    File(PathBuf),
    /// TOML text with no file lookup and no environment overrides.
    Inline(String),
}

impl ConfigSource {
    /// `File` when `TIJARA_CONFIG` is set, `Standard` otherwise.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) if !path.is_empty() => ConfigSource::File(PathBuf::from(path)),
            _ => ConfigSource::Standard,
        }
    }

    /// `(display name, contents)` of every readable file, for error spans.
    fn texts(&self) -> Vec<(String, String)> {
        match self {
            ConfigSource::Standard => loader::standard_paths()
                .iter()
                .filter_map(|path| read_source(path))
                .collect(),
            ConfigSource::File(path) => read_source(path).into_iter().collect(),
            ConfigSource::Inline(text) => vec![(loader::INLINE_SOURCE.to_string(), text.clone())],
        }
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let display = std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();
    Some((display, content))
}

/// Load, validate and check credentials.
pub fn load(source: ConfigSource) -> Result<TijaraConfig, Vec<ConfigError>> {
    let extracted = match &source {
        ConfigSource::Standard => loader::load_config(),
        ConfigSource::File(path) => loader::load_config_from_path(path),
        ConfigSource::Inline(text) => loader::load_config_from_str(text),
    };
    let config = extracted
        .map_err(|err| diagnostic::figment_to_config_errors(err, &source.texts()))?;

    let mut errors = validation::validate_config(&config).err().unwrap_or_default();
    errors.extend(check_credentials(&config).err().unwrap_or_default());
    if errors.is_empty() { Ok(config) } else { Err(errors) }
}

/// Shorthand for [`load`] with [`ConfigSource::Inline`].
pub fn load_str(toml_content: &str) -> Result<TijaraConfig, Vec<ConfigError>> {
    load(ConfigSource::Inline(toml_content.to_string()))
}

/// Every credential must convert into a pool credential. Tenant ids are
/// checked here by the same rule the pool applies.
fn check_credentials(config: &TijaraConfig) -> Result<(), Vec<ConfigError>> {
    let errors: Vec<ConfigError> = config
        .credentials
        .iter()
        .filter_map(|cred| {
            cred.to_credential(&config.pool).err().map(|e| ConfigError::Credential {
                id: cred.id.clone(),
                reason: e.to_string(),
            })
        })
        .collect();
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CredentialConfig;

    fn credential(tenant: &str) -> CredentialConfig {
        CredentialConfig {
            id: "k1".to_string(),
            tenant_id: Some(tenant.to_string()),
            provider: "gemini".to_string(),
            api_key: "key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            priority: 1,
            is_active: true,
            rpm: None,
            rph: None,
            rpd: None,
        }
    }

    #[test]
    fn unconvertible_credential_is_named() {
        let mut config = TijaraConfig::default();
        config.credentials = vec![credential("shop-1"), credential("\u{3000}")];
        config.credentials[1].id = "k2".to_string();
        let errors = check_credentials(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ConfigError::Credential { id, .. } if id == "k2"));
    }

    #[test]
    fn inline_source_reports_against_inline_text() {
        let source = ConfigSource::Inline("[pool]\n".to_string());
        let texts = source.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, loader::INLINE_SOURCE);
    }

    #[test]
    fn missing_file_source_has_no_text() {
        let source = ConfigSource::File(PathBuf::from("/nonexistent/tijara.toml"));
        assert!(source.texts().is_empty());
    }
}
