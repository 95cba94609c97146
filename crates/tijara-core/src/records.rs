// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted record shapes for patterns, pattern usage, and conflict reports.
//!
//! These are the rows the core reads from and writes to the pattern
//! repository collaborator. Pattern payloads are kept as raw JSON here and
//! validated into a typed union by `tijara-patterns` on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{ConversationId, PatternId, TenantId};

/// A success pattern as stored by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPattern {
    pub id: PatternId,
    pub tenant_id: TenantId,
    /// Discriminant string, e.g. `word_usage`.
    pub pattern_type: String,
    /// Type-specific payload, untrusted until validated.
    pub payload: serde_json::Value,
    pub success_rate: f32,
    pub sample_size: u32,
    pub is_approved: bool,
    pub is_active: bool,
    pub discovered_at: DateTime<Utc>,
}

impl StoredPattern {
    /// Eligible for application: approved by a human and active.
    pub fn is_live(&self) -> bool {
        self.is_approved && self.is_active
    }
}

/// One usage row per pattern considered during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternUsageRecord {
    pub pattern_id: PatternId,
    pub conversation_id: ConversationId,
    pub tenant_id: TenantId,
    pub applied: bool,
    /// Whether the turn the pattern took part in produced a customer reply.
    pub successful: bool,
    pub created_at: DateTime<Utc>,
}

/// Direction of a pattern's success rate against its previous value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Up,
    #[default]
    Stable,
    Down,
}

/// Rolling performance aggregate for one pattern, updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPerformance {
    pub pattern_id: PatternId,
    pub tenant_id: TenantId,
    pub usage_count: u64,
    pub success_count: u64,
    /// Current success rate in `[0.0, 1.0]`.
    pub success_rate: f32,
    pub previous_rate: f32,
    pub trend: Trend,
    /// `success_rate - baseline`, where baseline is the discovery rate.
    pub impact_score: f32,
    pub roi: f32,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Dimension in which a base prompt and a pattern disagree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictType {
    LanguageStyle,
    Personality,
    ResponseStyle,
    WordChoice,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

/// A detected contradiction between a tenant's base prompt and its patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub tenant_id: TenantId,
    pub conflict_type: ConflictType,
    /// Short excerpt of the prompt text that triggered the detection.
    pub prompt_excerpt: String,
    pub patterns_involved: Vec<PatternId>,
    pub severity: Severity,
    pub description: String,
    pub resolved: bool,
}
