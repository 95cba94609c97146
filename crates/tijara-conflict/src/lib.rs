// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conflict detection and resolution between a tenant's personality prompt
//! and its approved patterns.
//!
//! Detection and resolution are pure functions of their inputs: the same
//! prompt, patterns, and settings always give the same reports and the same
//! resolved prompt.

pub mod detect;
pub mod lexicon;
pub mod profile;
pub mod resolve;

use tijara_core::{ConflictReport, PrioritySettings, Severity, TenantId};
use tijara_patterns::{Pattern, PatternPayload, Phrasing};
use tracing::debug;

pub use detect::{
    Detection, Detector, LanguageStyleDetector, PersonalityDetector, ResponseStyleDetector,
    WordChoiceDetector, aggregate_severity,
};
pub use profile::{Demeanor, LengthPreference, PromptProfile, Register};
pub use resolve::{Resolution, to_formal};

use crate::lexicon::{has_colloquial, is_colloquial};
use crate::profile::{BRIEF_MAX_WORDS, DETAILED_MIN_WORDS, SERIOUS_MAX_SENTIMENT};

pub struct ConflictResolver {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self {
            detectors: vec![
                Box::new(LanguageStyleDetector),
                Box::new(PersonalityDetector),
                Box::new(ResponseStyleDetector),
                Box::new(WordChoiceDetector),
            ],
        }
    }
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every detector and returns one report per detected conflict.
    pub fn detect(
        &self,
        tenant_id: &TenantId,
        base_prompt: &str,
        patterns: &[Pattern],
    ) -> Vec<ConflictReport> {
        if patterns.is_empty() {
            return Vec::new();
        }
        let profile = PromptProfile::analyse(base_prompt);
        let reports: Vec<ConflictReport> = self
            .detectors
            .iter()
            .map(|d| d.detect(base_prompt, &profile, patterns))
            .filter(|d| d.has_conflict)
            .map(|d| ConflictReport {
                tenant_id: tenant_id.clone(),
                conflict_type: d.conflict_type,
                prompt_excerpt: d.excerpt,
                patterns_involved: d.patterns,
                severity: d.severity,
                description: d.description,
                resolved: false,
            })
            .collect();
        for report in &reports {
            metrics::counter!(
                "tijara_conflicts_detected_total",
                "type" => report.conflict_type.to_string()
            )
            .increment(1);
        }
        debug!(
            tenant_id = %tenant_id,
            conflicts = reports.len(),
            severity = %overall_severity(&reports),
            "conflict detection finished"
        );
        reports
    }

    /// Applies the tenant's strategy to the detected conflicts.
    pub fn resolve(
        &self,
        base_prompt: &str,
        patterns: &[Pattern],
        reports: &[ConflictReport],
        settings: &PrioritySettings,
    ) -> Resolution {
        let profile = PromptProfile::analyse(base_prompt);
        resolve::resolve(base_prompt, &profile, patterns, reports, settings)
    }

    /// Wording register response rewrites must keep to.
    pub fn phrasing(&self, base_prompt: &str) -> Phrasing {
        match PromptProfile::analyse(base_prompt).register {
            Register::Formal => Phrasing::Formal,
            Register::Colloquial | Register::Unspecified => Phrasing::Everyday,
        }
    }

    /// Patterns that agree with everything the prompt asks for.
    pub fn compatible_patterns(&self, base_prompt: &str, patterns: &[Pattern]) -> Vec<Pattern> {
        let profile = PromptProfile::analyse(base_prompt);
        patterns
            .iter()
            .filter(|p| is_compatible(&profile, p))
            .cloned()
            .collect()
    }
}

pub fn overall_severity(reports: &[ConflictReport]) -> Severity {
    aggregate_severity(reports.iter().map(|r| r.severity))
}

fn is_compatible(profile: &PromptProfile, pattern: &Pattern) -> bool {
    match &pattern.payload {
        PatternPayload::WordUsage(usage) => usage.successful_words.iter().all(|w| {
            !(profile.register == Register::Formal && is_colloquial(w)) && !profile.prohibits(w)
        }),
        PatternPayload::EmotionalTone(tone) => {
            let register_ok = profile.register != Register::Formal
                || !tone.openers.iter().any(|o| has_colloquial(o));
            let demeanor_ok = profile.demeanor != Demeanor::Serious
                || tone.target_sentiment <= SERIOUS_MAX_SENTIMENT;
            register_ok && demeanor_ok
        }
        PatternPayload::ResponseStyle(style) => {
            let length_ok = match profile.length {
                LengthPreference::Brief => style.target_word_count <= BRIEF_MAX_WORDS,
                LengthPreference::Detailed => style.target_word_count >= DETAILED_MIN_WORDS,
                LengthPreference::Unspecified => true,
            };
            length_ok && !(profile.no_closing_questions && style.ends_with_question)
        }
        PatternPayload::Timing(_) => true,
    }
}
