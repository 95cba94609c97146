// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tijara response engine.

use thiserror::Error;

use crate::types::QuotaViolation;

/// The primary error type used across all Tijara crates and collaborator traits.
#[derive(Debug, Error)]
pub enum TijaraError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage collaborator errors (memory store, pattern repository).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Non-quota failures from a completion provider.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single model hit a provider quota (HTTP 429).
    #[error("model `{model}` rate limited: {violation}")]
    RateLimited {
        model: String,
        violation: QuotaViolation,
    },

    /// Every credential available to the tenant is exhausted or rate limited.
    #[error("no usable model available for tenant `{tenant_id}`")]
    PoolExhausted { tenant_id: String },

    /// The tenant has no base prompt, so there is no personality to answer with.
    #[error("tenant `{tenant_id}` has no base prompt configured")]
    MissingTenantConfig { tenant_id: String },

    /// A core call arrived without a tenant identifier.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// The external order service rejected or failed to create an order.
    #[error("order service failure: {message}")]
    OrderService {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TijaraError {
    /// Whether another attempt (possibly on another model) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TijaraError::RateLimited { .. }
                | TijaraError::Provider { .. }
                | TijaraError::Timeout { .. }
        )
    }

    /// Whether this error must be converted into a no-content reply.
    ///
    /// Internal and provider detail never reaches a customer chat channel.
    pub fn is_customer_silent(&self) -> bool {
        matches!(
            self,
            TijaraError::PoolExhausted { .. }
                | TijaraError::RateLimited { .. }
                | TijaraError::Provider { .. }
                | TijaraError::Timeout { .. }
                | TijaraError::Storage { .. }
                | TijaraError::Internal(_)
        )
    }

    /// Whether this error must stay visible to operators instead of being swallowed.
    pub fn is_operator_visible(&self) -> bool {
        matches!(
            self,
            TijaraError::MissingTenantConfig { .. }
                | TijaraError::SecurityViolation(_)
                | TijaraError::OrderService { .. }
                | TijaraError::Config(_)
        )
    }

    /// Short stable label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TijaraError::Config(_) => "config",
            TijaraError::Storage { .. } => "storage",
            TijaraError::Provider { .. } => "provider",
            TijaraError::RateLimited { .. } => "rate_limited",
            TijaraError::PoolExhausted { .. } => "pool_exhausted",
            TijaraError::MissingTenantConfig { .. } => "missing_tenant_config",
            TijaraError::SecurityViolation(_) => "security_violation",
            TijaraError::OrderService { .. } => "order_service",
            TijaraError::Timeout { .. } => "timeout",
            TijaraError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation() -> QuotaViolation {
        QuotaViolation {
            quota_id: "GenerateRequestsPerMinutePerProjectPerModel".into(),
            quota_value: Some(15),
            retry_after: None,
        }
    }

    #[test]
    fn rate_limit_is_retryable_and_silent() {
        let err = TijaraError::RateLimited {
            model: "gemini-2.0-flash".into(),
            violation: violation(),
        };
        assert!(err.is_retryable());
        assert!(err.is_customer_silent());
        assert!(!err.is_operator_visible());
        assert_eq!(err.kind(), "rate_limited");
    }

    #[test]
    fn pool_exhausted_is_terminal() {
        let err = TijaraError::PoolExhausted {
            tenant_id: "t1".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.is_customer_silent());
    }

    #[test]
    fn business_errors_stay_visible() {
        let order = TijaraError::OrderService {
            message: "timeout".into(),
            source: None,
        };
        let missing = TijaraError::MissingTenantConfig {
            tenant_id: "t1".into(),
        };
        let security = TijaraError::SecurityViolation("missing tenant".into());
        for err in [order, missing, security] {
            assert!(err.is_operator_visible(), "{err} must be operator visible");
            assert!(!err.is_customer_silent(), "{err} must not be silenced");
        }
    }

    #[test]
    fn display_includes_violation() {
        let err = TijaraError::RateLimited {
            model: "gemini-2.0-flash".into(),
            violation: violation(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gemini-2.0-flash"));
        assert!(msg.contains("GenerateRequestsPerMinutePerProjectPerModel"));
    }
}
