// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tijara response engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tijara_core::{ApiKey, CredentialId, ModelCredential, TenantId, TijaraError, WindowLimits};

/// Order fields that may be listed in `orders.required_fields`.
pub const KNOWN_ORDER_FIELDS: &[&str] =
    &["customer_name", "customer_phone", "customer_address", "city"];

/// Top-level Tijara configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TijaraConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Model pool and rate-limit window settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Provider credentials. Entries without `tenant_id` form the shared pool.
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,

    /// Google Generative Language API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Pattern application and learning settings.
    #[serde(default)]
    pub patterns: PatternsConfig,

    /// Turn orchestration settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Order intent detection settings.
    #[serde(default)]
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Service name reported in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_agent_name() -> String {
    "tijara".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Model pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Period of the window reset sweeper.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum provider calls per turn, failover included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Requests per minute when a credential sets no limit.
    #[serde(default = "default_rpm")]
    pub default_rpm: u32,

    /// Requests per hour when a credential sets no limit.
    #[serde(default = "default_rph")]
    pub default_rph: u32,

    /// Requests per day when a credential sets no limit.
    #[serde(default = "default_rpd")]
    pub default_rpd: u32,

    /// Exhaustion TTL after a per-minute quota violation.
    #[serde(default = "default_minute_exhaustion_secs")]
    pub minute_exhaustion_secs: u64,

    /// Exhaustion TTL after a per-hour quota violation.
    #[serde(default = "default_hour_exhaustion_secs")]
    pub hour_exhaustion_secs: u64,

    /// Exhaustion TTL after a per-day quota violation.
    #[serde(default = "default_day_exhaustion_secs")]
    pub day_exhaustion_secs: u64,
}

impl PoolConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn default_limits(&self) -> WindowLimits {
        WindowLimits {
            rpm: self.default_rpm,
            rph: self.default_rph,
            rpd: self.default_rpd,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            max_attempts: default_max_attempts(),
            default_rpm: default_rpm(),
            default_rph: default_rph(),
            default_rpd: default_rpd(),
            minute_exhaustion_secs: default_minute_exhaustion_secs(),
            hour_exhaustion_secs: default_hour_exhaustion_secs(),
            day_exhaustion_secs: default_day_exhaustion_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    2
}

fn default_rpm() -> u32 {
    15
}

fn default_rph() -> u32 {
    250
}

fn default_rpd() -> u32 {
    1500
}

fn default_minute_exhaustion_secs() -> u64 {
    60
}

fn default_hour_exhaustion_secs() -> u64 {
    3600
}

fn default_day_exhaustion_secs() -> u64 {
    86_400
}

/// One `[[credentials]]` entry.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    pub id: String,

    /// Owning tenant. Absent means the shared pool.
    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(default = "default_provider")]
    pub provider: String,

    pub api_key: String,

    pub model: String,

    /// Lower is tried first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub rpm: Option<u32>,

    #[serde(default)]
    pub rph: Option<u32>,

    #[serde(default)]
    pub rpd: Option<u32>,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("priority", &self.priority)
            .field("is_active", &self.is_active)
            .field("rpm", &self.rpm)
            .field("rph", &self.rph)
            .field("rpd", &self.rpd)
            .finish()
    }
}

impl CredentialConfig {
    /// Builds a pool credential, filling unset limits from the pool defaults.
    pub fn to_credential(&self, pool: &PoolConfig) -> Result<ModelCredential, TijaraError> {
        let tenant_id = match &self.tenant_id {
            Some(id) => Some(TenantId::new(id.as_str())?),
            None => None,
        };
        Ok(ModelCredential {
            id: CredentialId::from(self.id.as_str()),
            tenant_id,
            provider: self.provider.clone(),
            api_key: ApiKey::new(self.api_key.as_str()),
            model_name: self.model.clone(),
            priority: self.priority,
            is_active: self.is_active,
            limits: WindowLimits {
                rpm: self.rpm.unwrap_or(pool.default_rpm),
                rph: self.rph.unwrap_or(pool.default_rph),
                rpd: self.rpd.unwrap_or(pool.default_rpd),
            },
        })
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_priority() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

/// Google Generative Language API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,

    /// Output token cap sent in `generationConfig`.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    30
}

fn default_max_output_tokens() -> u32 {
    1024
}

/// Pattern application and learning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatternsConfig {
    /// TTL of the per-tenant approved-pattern cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Tenant setting key that disables the pattern subsystem when `false`.
    #[serde(default = "default_enabled_setting")]
    pub enabled_setting: String,

    /// A successful word is inserted only above this success rate.
    #[serde(default = "default_insertion_min_success_rate")]
    pub insertion_min_success_rate: f32,

    /// Success-rate change (in percentage points) that flips a trend.
    #[serde(default = "default_trend_threshold_points")]
    pub trend_threshold_points: f32,

    /// Interactions buffered per tenant before analysis.
    #[serde(default = "default_learning_batch_size")]
    pub learning_batch_size: usize,

    /// Minimum successful interactions backing a discovered pattern.
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u32,

    /// Interactions at or above this confidence count as successful.
    #[serde(default = "default_success_min_confidence")]
    pub success_min_confidence: f32,

    /// Interactions at or above this sentiment count as successful.
    #[serde(default = "default_success_min_sentiment")]
    pub success_min_sentiment: f32,
}

impl PatternsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            enabled_setting: default_enabled_setting(),
            insertion_min_success_rate: default_insertion_min_success_rate(),
            trend_threshold_points: default_trend_threshold_points(),
            learning_batch_size: default_learning_batch_size(),
            min_sample_size: default_min_sample_size(),
            success_min_confidence: default_success_min_confidence(),
            success_min_sentiment: default_success_min_sentiment(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_enabled_setting() -> String {
    "patterns_enabled".to_string()
}

fn default_insertion_min_success_rate() -> f32 {
    0.75
}

fn default_trend_threshold_points() -> f32 {
    5.0
}

fn default_learning_batch_size() -> usize {
    20
}

fn default_min_sample_size() -> u32 {
    5
}

fn default_success_min_confidence() -> f32 {
    0.7
}

fn default_success_min_sentiment() -> f32 {
    0.2
}

/// Turn orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Maximum memory messages read per turn.
    #[serde(default = "default_max_memory_messages")]
    pub max_memory_messages: usize,

    /// Capacity of the background side-effect queue.
    #[serde(default = "default_background_queue_capacity")]
    pub background_queue_capacity: usize,

    /// Maximum retrieved snippets rendered into the prompt.
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_memory_messages: default_max_memory_messages(),
            background_queue_capacity: default_background_queue_capacity(),
            retrieval_limit: default_retrieval_limit(),
        }
    }
}

fn default_max_memory_messages() -> usize {
    50
}

fn default_background_queue_capacity() -> usize {
    1024
}

fn default_retrieval_limit() -> usize {
    5
}

/// Order intent detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrdersConfig {
    /// Memory turns searched backwards for the discussed product.
    #[serde(default = "default_product_lookback_turns")]
    pub product_lookback_turns: usize,

    /// Customer fields required before an order is created.
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,

    /// Retrieved snippets below this score are ignored.
    #[serde(default = "default_rag_match_threshold")]
    pub rag_match_threshold: f32,

    /// Retrieved snippets at or above this score are confident product matches.
    #[serde(default = "default_rag_confident_threshold")]
    pub rag_confident_threshold: f32,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            product_lookback_turns: default_product_lookback_turns(),
            required_fields: default_required_fields(),
            rag_match_threshold: default_rag_match_threshold(),
            rag_confident_threshold: default_rag_confident_threshold(),
        }
    }
}

fn default_product_lookback_turns() -> usize {
    6
}

fn default_required_fields() -> Vec<String> {
    vec!["customer_name".to_string(), "customer_phone".to_string()]
}

fn default_rag_match_threshold() -> f32 {
    0.7
}

fn default_rag_confident_threshold() -> f32 {
    0.85
}
