// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup.

use tijara_config::model::AgentConfig;
use tijara_core::TijaraError;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` overrides the configured level. `log_format = "json"` emits
/// one JSON object per event.
pub fn init_tracing(config: &AgentConfig) -> Result<(), TijaraError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    let result = if config.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TijaraError::Internal(format!("failed to install tracing subscriber: {e}")))
}

fn default_directive(level: &str) -> String {
    format!("tijara={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level_to_tijara_crates() {
        assert_eq!(default_directive("debug"), "tijara=debug,warn");
    }
}
