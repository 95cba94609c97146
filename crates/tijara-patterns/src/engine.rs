// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern application: loading approved patterns, injecting guidance into
//! prompts, optimizing generated responses, and recording usage.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use tijara_config::model::PatternsConfig;
use tijara_context::{Prompt, SectionKind};
use tijara_core::{
    ConversationId, Interaction, PatternId, PatternPerformance, PatternRepository,
    PatternUsageRecord, TenantConfigStore, TenantId, TijaraError,
};
use tracing::{debug, warn};

use crate::cache::PatternCache;
use crate::learning;
use crate::payload::{Pattern, PatternType};
use crate::performance::PerformanceTracker;
use crate::rewrite::{self, Phrasing};

/// Per-turn facts the response optimizer conditions on.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub message_type: &'a str,
    /// Sentiment of the customer's message in `[-1.0, 1.0]`.
    pub customer_sentiment: f32,
    /// Wording register the tenant's base prompt asks for.
    pub phrasing: Phrasing,
}

/// Target sentiment at or above which a positive opener is used.
const HIGH_TARGET_SENTIMENT: f32 = 0.5;

/// Customer sentiment below which cheerful openers are suppressed.
const UPSET_CUSTOMER_SENTIMENT: f32 = -0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedResponse {
    pub text: String,
    /// Patterns that changed the text, in application order.
    pub applied: Vec<PatternId>,
}

/// One pattern's participation in a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternUsage {
    pub pattern_id: PatternId,
    pub applied: bool,
}

pub struct PatternEngine {
    repository: Arc<dyn PatternRepository>,
    tenant_config: Arc<dyn TenantConfigStore>,
    cache: PatternCache,
    performance: PerformanceTracker,
    config: PatternsConfig,
}

impl PatternEngine {
    pub fn new(
        repository: Arc<dyn PatternRepository>,
        tenant_config: Arc<dyn TenantConfigStore>,
        config: PatternsConfig,
    ) -> Self {
        Self {
            repository,
            tenant_config,
            cache: PatternCache::new(config.cache_ttl()),
            performance: PerformanceTracker::new(config.trend_threshold_points),
            config,
        }
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    /// Whether the tenant has the pattern subsystem switched on.
    ///
    /// Missing, unreadable, or unparseable settings count as enabled.
    pub async fn is_enabled(&self, tenant_id: &TenantId) -> bool {
        match self
            .tenant_config
            .get_setting(tenant_id, &self.config.enabled_setting)
            .await
        {
            Ok(Some(value)) => parse_enabled(&value),
            Ok(None) => true,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "pattern setting unreadable, assuming enabled");
                true
            }
        }
    }

    /// Approved, active, valid patterns for the tenant.
    pub async fn get_approved(&self, tenant_id: &TenantId) -> Result<Arc<Vec<Pattern>>, TijaraError> {
        if !self.is_enabled(tenant_id).await {
            debug!(tenant_id = %tenant_id, "patterns disabled for tenant");
            return Ok(Arc::new(Vec::new()));
        }
        if let Some(cached) = self.cache.get(tenant_id) {
            return Ok(cached);
        }

        let generation = self.cache.generation(tenant_id);
        let stored = self.repository.list_approved(tenant_id).await?;
        let mut patterns = Vec::with_capacity(stored.len());
        for row in &stored {
            if row.tenant_id != *tenant_id {
                warn!(
                    tenant_id = %tenant_id,
                    pattern_id = %row.id,
                    owner = %row.tenant_id,
                    "repository returned another tenant's pattern, dropping"
                );
                continue;
            }
            if !row.is_live() {
                continue;
            }
            match Pattern::from_stored(row) {
                Ok(p) => patterns.push(p),
                Err(e) => {
                    warn!(tenant_id = %tenant_id, pattern_id = %row.id, error = %e, "skipping invalid pattern");
                }
            }
        }

        let patterns = Arc::new(patterns);
        if !self.cache.store(tenant_id, generation, Arc::clone(&patterns)) {
            debug!(tenant_id = %tenant_id, "pattern cache invalidated during load, not storing");
        }
        Ok(patterns)
    }

    /// Drops the tenant's cached patterns. Call after any approval or
    /// activation change.
    pub fn invalidate(&self, tenant_id: &TenantId) {
        self.cache.invalidate(tenant_id);
    }

    /// Whether this prompt and conflicting pattern set has not been reported
    /// since the tenant's patterns were last invalidated.
    pub fn first_conflict_report(
        &self,
        tenant_id: &TenantId,
        base_prompt: &str,
        pattern_ids: &[&PatternId],
    ) -> bool {
        let mut ids: Vec<&str> = pattern_ids.iter().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        let mut hasher = DefaultHasher::new();
        base_prompt.hash(&mut hasher);
        ids.hash(&mut hasher);
        self.cache.first_report(tenant_id, hasher.finish())
    }

    /// Whether a finished turn counts as a favourable outcome for the
    /// patterns that took part in it.
    pub fn is_successful(&self, interaction: &Interaction) -> bool {
        learning::is_successful(interaction, &self.config)
    }

    /// Appends one guidance section per pattern type, in a fixed order.
    pub fn apply_to_prompt(&self, mut prompt: Prompt, patterns: &[Pattern], message_type: &str) -> Prompt {
        for kind in GUIDANCE_ORDER {
            let lines: Vec<String> = patterns
                .iter()
                .filter(|p| p.pattern_type() == kind)
                .filter_map(|p| guidance_line(p, message_type))
                .collect();
            if !lines.is_empty() {
                prompt.push(SectionKind::PatternGuidance, lines.join("\n"));
            }
        }
        prompt
    }

    /// Rewrites a generated response according to the patterns.
    ///
    /// Applying the same patterns to the output again leaves it unchanged.
    pub fn apply_to_response(
        &self,
        raw: &str,
        patterns: &[Pattern],
        ctx: &ResponseContext<'_>,
    ) -> OptimizedResponse {
        let mut text = raw.trim().to_string();
        let mut applied = Vec::new();

        for p in patterns {
            let Some(words) = p.word_usage() else { continue };
            if let Some(out) = rewrite::replace_failure_words(&text, &words.failure_words, ctx.phrasing) {
                text = out;
                mark_applied(&mut applied, &p.id);
            }
            if p.success_rate > self.config.insertion_min_success_rate {
                let inserted = words
                    .successful_words
                    .first()
                    .and_then(|w| rewrite::insert_word(&text, w));
                if let Some(out) = inserted {
                    text = out;
                    mark_applied(&mut applied, &p.id);
                }
            }
        }

        // One tone and one style pattern at most, so competing targets
        // cannot undo each other.
        let tone = patterns.iter().find_map(|p| {
            p.emotional_tone()
                .filter(|t| t.target_sentiment >= HIGH_TARGET_SENTIMENT)
                .map(|t| (p, t))
        });
        if let Some((p, tone)) = tone {
            if ctx.customer_sentiment >= UPSET_CUSTOMER_SENTIMENT {
                if let Some(out) = rewrite::prepend_opener(&text, &tone.openers, ctx.phrasing) {
                    text = out;
                    mark_applied(&mut applied, &p.id);
                }
            }
        }

        // Length fitting runs last so it measures the final wording.
        let style = patterns
            .iter()
            .find_map(|p| p.response_style().map(|s| (p, s)));
        if let Some((p, style)) = style {
            if let Some(out) =
                rewrite::fit_length(&text, style.target_word_count, style.ends_with_question)
            {
                text = out;
                mark_applied(&mut applied, &p.id);
            }
        }

        debug!(message_type = ctx.message_type, applied = applied.len(), "response optimized");
        OptimizedResponse { text, applied }
    }

    /// Writes one usage row per pattern in a single repository call, then
    /// updates and persists the rolling aggregates.
    pub async fn record_usage_batch(
        &self,
        usages: &[PatternUsage],
        conversation_id: &ConversationId,
        tenant_id: &TenantId,
        successful: bool,
    ) -> Result<Vec<PatternPerformance>, TijaraError> {
        if usages.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let records: Vec<PatternUsageRecord> = usages
            .iter()
            .map(|u| PatternUsageRecord {
                pattern_id: u.pattern_id.clone(),
                conversation_id: conversation_id.clone(),
                tenant_id: tenant_id.clone(),
                applied: u.applied,
                successful,
                created_at: now,
            })
            .collect();
        self.repository.insert_usage_batch(tenant_id, records).await?;
        metrics::counter!("tijara_pattern_usage_records_total").increment(usages.len() as u64);

        let cached = self.cache.get(tenant_id);
        let snapshots: Vec<PatternPerformance> = usages
            .iter()
            .map(|u| {
                let baseline = cached
                    .as_ref()
                    .and_then(|ps| ps.iter().find(|p| p.id == u.pattern_id))
                    .map(|p| p.success_rate)
                    .unwrap_or(0.0);
                self.performance
                    .record(tenant_id, &u.pattern_id, baseline, successful, now)
            })
            .collect();
        self.repository
            .save_performance(tenant_id, snapshots.clone())
            .await?;
        Ok(snapshots)
    }
}

const GUIDANCE_ORDER: [PatternType; 4] = [
    PatternType::WordUsage,
    PatternType::ResponseStyle,
    PatternType::EmotionalTone,
    PatternType::Timing,
];

fn mark_applied(applied: &mut Vec<PatternId>, id: &PatternId) {
    if !applied.contains(id) {
        applied.push(id.clone());
    }
}

fn parse_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no" | "disabled"
    )
}

fn guidance_line(pattern: &Pattern, message_type: &str) -> Option<String> {
    if let Some(words) = pattern.word_usage() {
        let mut parts = Vec::new();
        if !words.successful_words.is_empty() {
            parts.push(format!(
                "Words that worked well with customers: {}.",
                words.successful_words.join("، ")
            ));
        }
        if !words.failure_words.is_empty() {
            parts.push(format!("Avoid: {}.", words.failure_words.join("، ")));
        }
        return (!parts.is_empty()).then(|| parts.join(" "));
    }
    if let Some(style) = pattern.response_style() {
        let mut line = format!(
            "For {message_type} messages, aim for about {} words",
            style.target_word_count
        );
        if style.ends_with_question {
            line.push_str(" and end with a question");
        }
        line.push('.');
        return Some(line);
    }
    if let Some(tone) = pattern.emotional_tone() {
        let line = if tone.target_sentiment >= HIGH_TARGET_SENTIMENT {
            "Keep a warm and upbeat tone."
        } else if tone.target_sentiment >= 0.0 {
            "Keep a friendly and calm tone."
        } else {
            "Keep a calm and empathetic tone."
        };
        return Some(line.to_string());
    }
    let timing = pattern.timing()?;
    let hours: Vec<String> = timing.peak_hours.iter().map(|h| format!("{h:02}:00")).collect();
    Some(format!(
        "Customers are most active around {} UTC; keep replies quick and direct then.",
        hours.join(", ")
    ))
}
