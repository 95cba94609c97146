// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the pool, pattern, conflict, order, and agent crates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TijaraError;

/// Identifier of a tenant (a company using the platform).
///
/// Can only be built from a non-empty string, so every function taking a
/// `&TenantId` is tenant-scoped by construction. Raw identifiers coming from
/// the outer layer go through [`TenantId::from_optional`], which turns a
/// missing id into [`TijaraError::SecurityViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validates and wraps a tenant identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TijaraError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(TijaraError::SecurityViolation(
                "empty tenant id on a tenant-scoped call".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Validates an identifier that may be absent at the system boundary.
    pub fn from_optional(id: Option<&str>) -> Result<Self, TijaraError> {
        match id {
            Some(id) => Self::new(id),
            None => Err(TijaraError::SecurityViolation(
                "missing tenant id on a tenant-scoped call".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = TijaraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a conversation thread on a channel.
    ConversationId
);
string_id!(
    /// Identifier of an end customer.
    CustomerId
);
string_id!(
    /// Identifier of a (key, model) credential in the model pool.
    CredentialId
);
string_id!(
    /// Identifier of a discovered success pattern.
    PatternId
);

// --- Conversation types ---

/// A product referenced during a turn, carried from retrieval into memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMention {
    pub name: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// One completed exchange between a customer and the agent.
///
/// Append-only. Produced by the orchestrator, stored by the memory
/// collaborator, consumed by the learning pipeline and the order state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub conversation_id: ConversationId,
    pub customer_id: CustomerId,
    pub tenant_id: TenantId,
    pub user_message: String,
    pub ai_response: String,
    /// Classified intent, or an order-state marker for order turns.
    pub intent: String,
    /// Sentiment score in `[-1.0, 1.0]`.
    pub sentiment: f32,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub model_used: Option<String>,
    /// Products the turn was grounded on (confident retrieval matches).
    #[serde(default)]
    pub mentioned_products: Vec<ProductMention>,
    pub created_at: DateTime<Utc>,
}

/// A retrieval result from the RAG collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSnippet {
    pub text: String,
    /// Relevance score in `[0.0, 1.0]`.
    pub score: f32,
    /// Set when the snippet describes a catalog product.
    #[serde(default)]
    pub product: Option<ProductMention>,
}

/// Token accounting returned by a completion provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A raw completion returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

// --- Model pool types ---

/// Provider API key. Never printed by `Debug`.
#[derive(Clone)]
pub struct ApiKey(Arc<SecretString>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(key.into())))
    }

    /// Returns the raw key for request signing.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Request budgets for one credential, per window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLimits {
    pub rpm: u32,
    pub rph: u32,
    pub rpd: u32,
}

/// A (key, model) pair in the pool.
///
/// `tenant_id == None` places the credential in the shared pool.
#[derive(Debug, Clone)]
pub struct ModelCredential {
    pub id: CredentialId,
    pub tenant_id: Option<TenantId>,
    pub provider: String,
    pub api_key: ApiKey,
    pub model_name: String,
    /// Lower is tried first.
    pub priority: i32,
    pub is_active: bool,
    pub limits: WindowLimits,
}

/// Quota metadata parsed from a provider rate-limit response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaViolation {
    /// Provider quota identifier, e.g. `GenerateRequestsPerMinutePerProjectPerModel`.
    pub quota_id: String,
    /// The quota limit reported by the provider, if any.
    pub quota_value: Option<u64>,
    /// Provider-suggested retry delay, if any.
    pub retry_after: Option<Duration>,
}

impl fmt::Display for QuotaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quota `{}`", self.quota_id)?;
        if let Some(value) = self.quota_value {
            write!(f, " (limit {value})")?;
        }
        if let Some(delay) = self.retry_after {
            write!(f, ", retry after {}s", delay.as_secs())?;
        }
        Ok(())
    }
}

// --- Tenant settings ---

/// Relative weight of the base prompt or the learned patterns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    #[default]
    High,
    Medium,
    Low,
}

/// How contradictions between base prompt and patterns are settled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictStrategy {
    PromptWins,
    PatternsWin,
    #[default]
    MergeSmart,
}

/// Per-tenant prompt/pattern priority settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySettings {
    pub prompt_priority: Priority,
    pub patterns_priority: Priority,
    pub conflict_resolution: ConflictStrategy,
    pub enforce_personality: bool,
    pub enforce_language_style: bool,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            prompt_priority: Priority::High,
            patterns_priority: Priority::Medium,
            conflict_resolution: ConflictStrategy::MergeSmart,
            enforce_personality: true,
            enforce_language_style: true,
        }
    }
}

// --- Order types ---

/// Order fields gathered from conversation memory and the current message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub product_name: Option<String>,
    pub variant: Option<String>,
    pub price: Option<f64>,
    pub quantity: u32,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub city: Option<String>,
    /// Fraction of known fields that are filled, in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            product_name: None,
            variant: None,
            price: None,
            quantity: 1,
            customer_name: None,
            customer_phone: None,
            customer_address: None,
            city: None,
            confidence: 0.0,
        }
    }
}

/// Result of a successful order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_number: String,
    pub total: f64,
}
