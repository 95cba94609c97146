// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern discovery from completed interactions.
//!
//! Interactions are buffered per tenant. A full batch (or an explicit
//! flush) is analysed and any discovered patterns are stored unapproved;
//! a human approves them before the application engine will use them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Timelike, Utc};
use dashmap::DashMap;
use tijara_config::model::PatternsConfig;
use tijara_core::{Interaction, PatternId, PatternRepository, TenantId, TijaraError};
use tracing::{debug, info, warn};

use crate::payload::{EmotionalTone, Pattern, PatternPayload, ResponseStyle, Timing, WordUsage};

const MAX_WORDS: usize = 5;
const MIN_WORD_CHARS: usize = 3;
/// Minimum difference in document frequency between the two outcome groups.
const MIN_WORD_LIFT: f32 = 0.3;
const MAX_PEAK_HOURS: usize = 3;

const STOPWORDS: &[&str] = &[
    "في", "من", "على", "الى", "إلى", "عن", "مع", "ده", "دي", "دا", "انا", "أنا", "انت", "إنت",
    "هو", "هي", "احنا", "إحنا", "اللي", "التي", "الذي", "كان", "كانت", "لو", "بس", "the", "and",
    "you", "for", "are", "with", "this", "that", "your",
];

pub struct LearningPipeline {
    repository: Arc<dyn PatternRepository>,
    config: PatternsConfig,
    buffers: DashMap<TenantId, Vec<Interaction>>,
}

impl LearningPipeline {
    pub fn new(repository: Arc<dyn PatternRepository>, config: PatternsConfig) -> Self {
        Self {
            repository,
            config,
            buffers: DashMap::new(),
        }
    }

    /// Buffers one interaction and analyses the tenant's batch once full.
    ///
    /// Returns the number of patterns stored.
    pub async fn ingest(&self, interaction: Interaction) -> Result<usize, TijaraError> {
        let tenant_id = interaction.tenant_id.clone();
        let batch = {
            let mut buffer = self.buffers.entry(tenant_id.clone()).or_default();
            buffer.push(interaction);
            if buffer.len() < self.config.learning_batch_size {
                return Ok(0);
            }
            std::mem::take(&mut *buffer)
        };
        self.analyse(&tenant_id, batch).await
    }

    /// Analyses whatever is buffered for the tenant, even a partial batch.
    pub async fn flush(&self, tenant_id: &TenantId) -> Result<usize, TijaraError> {
        let batch = self
            .buffers
            .get_mut(tenant_id)
            .map(|mut b| std::mem::take(&mut *b))
            .unwrap_or_default();
        if batch.is_empty() {
            return Ok(0);
        }
        self.analyse(tenant_id, batch).await
    }

    pub fn buffered(&self, tenant_id: &TenantId) -> usize {
        self.buffers.get(tenant_id).map(|b| b.len()).unwrap_or(0)
    }

    async fn analyse(&self, tenant_id: &TenantId, batch: Vec<Interaction>) -> Result<usize, TijaraError> {
        let patterns = discover(tenant_id, &batch, &self.config);
        debug!(
            tenant_id = %tenant_id,
            interactions = batch.len(),
            discovered = patterns.len(),
            "learning batch analysed"
        );
        if patterns.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let rows = patterns.iter().map(|p| p.to_discovered(now)).collect();
        if let Err(e) = self.repository.insert_discovered(tenant_id, rows).await {
            warn!(tenant_id = %tenant_id, error = %e, "discovered patterns not stored, batch kept for retry");
            self.restore(tenant_id, batch);
            return Err(e);
        }
        info!(tenant_id = %tenant_id, count = patterns.len(), "stored discovered patterns for review");
        Ok(patterns.len())
    }

    /// Puts an unstored batch back ahead of anything buffered since.
    fn restore(&self, tenant_id: &TenantId, batch: Vec<Interaction>) {
        let mut buffer = self.buffers.entry(tenant_id.clone()).or_default();
        let newer = std::mem::replace(&mut *buffer, batch);
        buffer.extend(newer);
    }
}

/// Whether an interaction counts as a favourable outcome.
pub fn is_successful(interaction: &Interaction, config: &PatternsConfig) -> bool {
    !interaction.ai_response.trim().is_empty()
        && interaction.confidence >= config.success_min_confidence
        && interaction.sentiment >= config.success_min_sentiment
}

/// Derives at most one pattern per type from a batch.
///
/// Nothing is emitted unless the batch holds at least `min_sample_size`
/// successful interactions, and only interactions of `tenant_id` are read.
pub fn discover(tenant_id: &TenantId, batch: &[Interaction], config: &PatternsConfig) -> Vec<Pattern> {
    let own: Vec<&Interaction> = batch.iter().filter(|i| i.tenant_id == *tenant_id).collect();
    let (successes, failures): (Vec<&Interaction>, Vec<&Interaction>) =
        own.iter().copied().partition(|i| is_successful(i, config));
    if successes.len() < config.min_sample_size as usize {
        return Vec::new();
    }

    let success_rate = successes.len() as f32 / own.len() as f32;
    let sample_size = successes.len() as u32;
    let make = |payload| Pattern {
        id: PatternId(uuid::Uuid::new_v4().to_string()),
        tenant_id: tenant_id.clone(),
        payload,
        success_rate,
        sample_size,
    };

    let mut out = Vec::new();
    if let Some(words) = word_usage(&successes, &failures) {
        out.push(make(PatternPayload::WordUsage(words)));
    }
    out.push(make(PatternPayload::ResponseStyle(response_style(&successes))));
    if let Some(timing) = timing(&successes) {
        out.push(make(PatternPayload::Timing(timing)));
    }
    out.push(make(PatternPayload::EmotionalTone(EmotionalTone {
        target_sentiment: mean(successes.iter().map(|i| i.sentiment)).clamp(-1.0, 1.0),
        openers: Vec::new(),
    })));
    out
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_WORD_CHARS)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()) && !t.chars().all(|c| c.is_numeric()))
        .collect()
}

/// Fraction of responses containing each word.
fn document_frequency(group: &[&Interaction]) -> HashMap<String, f32> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in group {
        for token in tokens(&i.ai_response) {
            *counts.entry(token).or_default() += 1;
        }
    }
    let n = group.len().max(1) as f32;
    counts
        .into_iter()
        .filter(|(_, c)| *c >= 2)
        .map(|(w, c)| (w, c as f32 / n))
        .collect()
}

fn ranked_by_lift(
    primary: &HashMap<String, f32>,
    other: &HashMap<String, f32>,
) -> Vec<String> {
    let mut scored: Vec<(String, f32)> = primary
        .iter()
        .map(|(w, f)| (w.clone(), f - other.get(w).copied().unwrap_or(0.0)))
        .filter(|(_, lift)| *lift >= MIN_WORD_LIFT)
        .collect();
    // Ties break alphabetically so discovery is deterministic.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.into_iter().take(MAX_WORDS).map(|(w, _)| w).collect()
}

fn word_usage(successes: &[&Interaction], failures: &[&Interaction]) -> Option<WordUsage> {
    let success_df = document_frequency(successes);
    let failure_df = document_frequency(failures);
    let successful_words = ranked_by_lift(&success_df, &failure_df);
    if successful_words.is_empty() {
        return None;
    }
    Some(WordUsage {
        successful_words,
        failure_words: ranked_by_lift(&failure_df, &success_df),
    })
}

fn response_style(successes: &[&Interaction]) -> ResponseStyle {
    let mut lengths: Vec<usize> = successes
        .iter()
        .map(|i| i.ai_response.split_whitespace().count())
        .collect();
    lengths.sort_unstable();
    let median = lengths.get(lengths.len() / 2).copied().unwrap_or(1).max(1);
    let questions = successes
        .iter()
        .filter(|i| {
            let r = i.ai_response.trim_end();
            r.ends_with('?') || r.ends_with('؟')
        })
        .count();
    ResponseStyle {
        target_word_count: median as u32,
        ends_with_question: questions * 2 > successes.len(),
    }
}

fn timing(successes: &[&Interaction]) -> Option<Timing> {
    let mut by_hour: BTreeMap<u8, usize> = BTreeMap::new();
    for i in successes {
        *by_hour.entry(i.created_at.hour() as u8).or_default() += 1;
    }
    let mut hours: Vec<(u8, usize)> = by_hour.into_iter().collect();
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut peak_hours: Vec<u8> = hours
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .take(MAX_PEAK_HOURS)
        .map(|(h, _)| h)
        .collect();
    peak_hours.sort_unstable();
    (!peak_hours.is_empty()).then_some(Timing { peak_hours })
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f32 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PatternType;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tijara_core::{ConflictReport, PatternPerformance, PatternUsageRecord, StoredPattern};

    #[derive(Default)]
    struct Recorder {
        discovered: Mutex<Vec<StoredPattern>>,
        failing: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PatternRepository for Recorder {
        async fn list_approved(&self, _t: &TenantId) -> Result<Vec<StoredPattern>, TijaraError> {
            Ok(Vec::new())
        }
        async fn insert_discovered(&self, _t: &TenantId, p: Vec<StoredPattern>) -> Result<(), TijaraError> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(TijaraError::Internal("patterns table unavailable".into()));
            }
            self.discovered.lock().unwrap().extend(p);
            Ok(())
        }
        async fn insert_usage_batch(&self, _t: &TenantId, _r: Vec<PatternUsageRecord>) -> Result<(), TijaraError> {
            Ok(())
        }
        async fn save_performance(&self, _t: &TenantId, _p: Vec<PatternPerformance>) -> Result<(), TijaraError> {
            Ok(())
        }
        async fn save_conflict_reports(&self, _t: &TenantId, _r: Vec<ConflictReport>) -> Result<(), TijaraError> {
            Ok(())
        }
    }

    fn interaction(tenant: &str, response: &str, sentiment: f32, confidence: f32, hour: u32) -> Interaction {
        Interaction {
            conversation_id: "c1".into(),
            customer_id: "u1".into(),
            tenant_id: TenantId::new(tenant).unwrap(),
            user_message: "بكام؟".into(),
            ai_response: response.into(),
            intent: "price_inquiry".into(),
            sentiment,
            confidence,
            processing_time_ms: 900,
            model_used: Some("gemini-2.0-flash".into()),
            mentioned_products: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, hour, 15, 0).unwrap(),
        }
    }

    fn batch() -> Vec<Interaction> {
        let mut b = Vec::new();
        for _ in 0..6 {
            b.push(interaction("t1", "تمام يا فندم، السعر 450 جنيه ومتوفر. تحب تطلبه؟", 0.6, 0.9, 20));
        }
        for _ in 0..3 {
            b.push(interaction("t1", "مستحيل نوفره دلوقتي", -0.4, 0.9, 3));
        }
        b
    }

    fn config() -> PatternsConfig {
        PatternsConfig {
            learning_batch_size: 9,
            min_sample_size: 5,
            ..PatternsConfig::default()
        }
    }

    #[test]
    fn discovers_one_pattern_per_type() {
        let t1 = TenantId::new("t1").unwrap();
        let found = discover(&t1, &batch(), &config());
        let types: Vec<PatternType> = found.iter().map(|p| p.pattern_type()).collect();
        assert_eq!(
            types,
            vec![
                PatternType::WordUsage,
                PatternType::ResponseStyle,
                PatternType::Timing,
                PatternType::EmotionalTone
            ]
        );

        let words = found[0].word_usage().unwrap();
        assert!(words.successful_words.contains(&"تمام".to_string()));
        assert!(words.failure_words.contains(&"مستحيل".to_string()));
        let style = found[1].response_style().unwrap();
        assert!(style.ends_with_question);
        assert_eq!(found[2].timing().unwrap().peak_hours, vec![20]);
        assert!((found[0].success_rate - 6.0 / 9.0).abs() < 1e-6);
        assert_eq!(found[0].sample_size, 6);
    }

    #[test]
    fn too_few_successes_discover_nothing() {
        let t1 = TenantId::new("t1").unwrap();
        let cfg = PatternsConfig {
            min_sample_size: 7,
            ..config()
        };
        assert!(discover(&t1, &batch(), &cfg).is_empty());
    }

    #[test]
    fn other_tenants_are_ignored() {
        let t2 = TenantId::new("t2").unwrap();
        assert!(discover(&t2, &batch(), &config()).is_empty());
    }

    #[tokio::test]
    async fn full_batch_is_stored_unapproved() {
        let repo = Arc::new(Recorder::default());
        let pipeline = LearningPipeline::new(Arc::clone(&repo) as Arc<dyn PatternRepository>, config());
        let t1 = TenantId::new("t1").unwrap();
        let mut stored = 0;
        for i in batch() {
            stored += pipeline.ingest(i).await.unwrap();
        }
        assert_eq!(stored, 4);
        assert_eq!(pipeline.buffered(&t1), 0);
        let rows = repo.discovered.lock().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| !r.is_approved && !r.is_active && r.tenant_id == t1));
    }

    #[tokio::test]
    async fn flush_analyses_a_partial_batch() {
        let repo = Arc::new(Recorder::default());
        let cfg = PatternsConfig {
            learning_batch_size: 100,
            ..config()
        };
        let pipeline = LearningPipeline::new(Arc::clone(&repo) as Arc<dyn PatternRepository>, cfg);
        let t1 = TenantId::new("t1").unwrap();
        for i in batch() {
            assert_eq!(pipeline.ingest(i).await.unwrap(), 0);
        }
        assert_eq!(pipeline.buffered(&t1), 9);
        assert_eq!(pipeline.flush(&t1).await.unwrap(), 4);
        assert_eq!(pipeline.flush(&t1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_store_keeps_the_batch_buffered() {
        let repo = Arc::new(Recorder::default());
        repo.failing.store(true, std::sync::atomic::Ordering::SeqCst);
        let pipeline = LearningPipeline::new(Arc::clone(&repo) as Arc<dyn PatternRepository>, config());
        let t1 = TenantId::new("t1").unwrap();
        let mut interactions = batch().into_iter();
        for i in interactions.by_ref().take(8) {
            assert_eq!(pipeline.ingest(i).await.unwrap(), 0);
        }
        let last = interactions.next().unwrap();
        assert!(pipeline.ingest(last).await.is_err());
        assert_eq!(pipeline.buffered(&t1), 9);

        repo.failing.store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(pipeline.flush(&t1).await.unwrap(), 4);
        assert_eq!(pipeline.buffered(&t1), 0);
        assert_eq!(repo.discovered.lock().unwrap().len(), 4);
    }
}
