// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of stopping at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{KNOWN_ORDER_FIELDS, TijaraConfig};

pub fn validate_config(config: &TijaraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !matches!(config.agent.log_format.as_str(), "pretty" | "json") {
        errors.push(ConfigError::validation(format!(
            "agent.log_format must be `pretty` or `json`, got `{}`",
            config.agent.log_format
        )));
    }

    let pool = &config.pool;
    if pool.sweep_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "pool.sweep_interval_secs must be greater than 0",
        ));
    }
    if !(1..=2).contains(&pool.max_attempts) {
        errors.push(ConfigError::validation(format!(
            "pool.max_attempts must be 1 or 2, got {}",
            pool.max_attempts
        )));
    }
    for (name, value) in [
        ("pool.default_rpm", pool.default_rpm),
        ("pool.default_rph", pool.default_rph),
        ("pool.default_rpd", pool.default_rpd),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!(
                "{name} must be greater than 0"
            )));
        }
    }

    let mut seen_ids = HashSet::new();
    for (i, cred) in config.credentials.iter().enumerate() {
        if cred.id.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "credentials[{i}].id must not be empty"
            )));
        } else if !seen_ids.insert(cred.id.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate credential id `{}` in [[credentials]] array",
                cred.id
            )));
        }
        if cred.api_key.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "credentials[{i}].api_key must not be empty"
            )));
        }
        if cred.model.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "credentials[{i}].model must not be empty"
            )));
        }
        for (name, value) in [("rpm", cred.rpm), ("rph", cred.rph), ("rpd", cred.rpd)] {
            if value == Some(0) {
                errors.push(ConfigError::validation(format!(
                    "credentials[{i}].{name} must be greater than 0"
                )));
            }
        }
    }

    let patterns = &config.patterns;
    check_unit_interval(
        &mut errors,
        "patterns.insertion_min_success_rate",
        patterns.insertion_min_success_rate,
    );
    check_unit_interval(
        &mut errors,
        "patterns.success_min_confidence",
        patterns.success_min_confidence,
    );
    if !(-1.0..=1.0).contains(&patterns.success_min_sentiment) {
        errors.push(ConfigError::validation(format!(
            "patterns.success_min_sentiment must be within [-1, 1], got {}",
            patterns.success_min_sentiment
        )));
    }
    if !(0.0..=100.0).contains(&patterns.trend_threshold_points) {
        errors.push(ConfigError::validation(format!(
            "patterns.trend_threshold_points must be within [0, 100], got {}",
            patterns.trend_threshold_points
        )));
    }
    if patterns.learning_batch_size == 0 {
        errors.push(ConfigError::validation(
            "patterns.learning_batch_size must be greater than 0",
        ));
    }

    if config.orchestrator.max_memory_messages == 0 {
        errors.push(ConfigError::validation(
            "orchestrator.max_memory_messages must be greater than 0",
        ));
    }
    if config.orchestrator.background_queue_capacity == 0 {
        errors.push(ConfigError::validation(
            "orchestrator.background_queue_capacity must be greater than 0",
        ));
    }

    let orders = &config.orders;
    check_unit_interval(
        &mut errors,
        "orders.rag_match_threshold",
        orders.rag_match_threshold,
    );
    check_unit_interval(
        &mut errors,
        "orders.rag_confident_threshold",
        orders.rag_confident_threshold,
    );
    if orders.rag_match_threshold > orders.rag_confident_threshold {
        errors.push(ConfigError::validation(format!(
            "orders.rag_match_threshold ({}) must not exceed orders.rag_confident_threshold ({})",
            orders.rag_match_threshold, orders.rag_confident_threshold
        )));
    }
    for field in &orders.required_fields {
        if !KNOWN_ORDER_FIELDS.contains(&field.as_str()) {
            errors.push(ConfigError::validation(format!(
                "orders.required_fields contains unknown field `{field}` (known: {})",
                KNOWN_ORDER_FIELDS.join(", ")
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unit_interval(errors: &mut Vec<ConfigError>, name: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::validation(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CredentialConfig;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn credential(id: &str) -> CredentialConfig {
        CredentialConfig {
            id: id.to_string(),
            tenant_id: None,
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
    fn default_config_validates() {
        assert!(validate_config(&TijaraConfig::default()).is_ok());
    }

    #[test]
    fn three_attempts_rejected() {
        let mut config = TijaraConfig::default();
        config.pool.max_attempts = 3;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "pool.max_attempts"));
    }

    #[test]
    fn duplicate_credential_ids_rejected() {
        let mut config = TijaraConfig::default();
        config.credentials = vec![credential("k1"), credential("k1")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate credential id `k1`"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = TijaraConfig::default();
        config.pool.default_rpm = 0;
        config.orders.rag_match_threshold = 1.5;
        config.orders.required_fields.push("shoe_size".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "pool.default_rpm"));
        assert!(has_message(&errors, "orders.rag_match_threshold"));
        assert!(has_message(&errors, "shoe_size"));
    }

    #[test]
    fn inverted_rag_thresholds_rejected() {
        let mut config = TijaraConfig::default();
        config.orders.rag_match_threshold = 0.9;
        config.orders.rag_confident_threshold = 0.8;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "must not exceed"));
    }

    #[test]
    fn credential_limit_overrides_must_be_positive() {
        let toml_str = r#"
[[credentials]]
id = "central-1"
api_key = "AIzaSyExample"
model = "gemini-2.0-flash"
priority = 1
rpm = 0
"#;
        let config: TijaraConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "credentials[0].rpm must be greater than 0"));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = TijaraConfig::default();
        config.agent.log_format = "xml".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "agent.log_format"));
    }
}
