// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution strategies.
//!
//! `prompt_wins` drops implicated patterns, `patterns_win` appends their
//! guidance to the prompt, and `merge_smart` rewrites implicated patterns to
//! fit the prompt (or appends permissive guidance when the tenant does not
//! enforce that dimension). `merge_smart` never removes a pattern.

use std::collections::BTreeSet;

use tijara_core::{ConflictReport, ConflictStrategy, ConflictType, PatternId, PrioritySettings};
use tijara_patterns::{Pattern, PatternPayload};

use crate::lexicon::{formal_equivalent, has_colloquial, is_colloquial};
use crate::profile::{
    BRIEF_MAX_WORDS, DETAILED_MIN_WORDS, Demeanor, LengthPreference, PromptProfile,
    SERIOUS_MAX_SENTIMENT,
};

const GUIDANCE_HEADER: &str = "Guidance from successful conversations:";

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub prompt: String,
    pub patterns: Vec<Pattern>,
    /// The input reports, marked resolved.
    pub reports: Vec<ConflictReport>,
    pub dropped: Vec<PatternId>,
    pub transformed: Vec<PatternId>,
}

pub(crate) fn resolve(
    base_prompt: &str,
    profile: &PromptProfile,
    patterns: &[Pattern],
    reports: &[ConflictReport],
    settings: &PrioritySettings,
) -> Resolution {
    let mut resolution = Resolution {
        prompt: base_prompt.to_string(),
        patterns: patterns.to_vec(),
        reports: reports
            .iter()
            .cloned()
            .map(|mut r| {
                r.resolved = true;
                r
            })
            .collect(),
        dropped: Vec::new(),
        transformed: Vec::new(),
    };
    if reports.is_empty() {
        return resolution;
    }

    let mut guidance: Vec<String> = Vec::new();
    match settings.conflict_resolution {
        ConflictStrategy::PromptWins => {
            let implicated: BTreeSet<&PatternId> =
                reports.iter().flat_map(|r| r.patterns_involved.iter()).collect();
            resolution.patterns.retain(|p| !implicated.contains(&p.id));
            resolution.dropped = patterns
                .iter()
                .filter(|p| implicated.contains(&p.id))
                .map(|p| p.id.clone())
                .collect();
        }
        ConflictStrategy::PatternsWin => {
            for report in reports {
                guidance.extend(pattern_guidance(report, patterns));
            }
        }
        ConflictStrategy::MergeSmart => {
            for report in reports {
                if enforced(report.conflict_type, settings) {
                    for pattern in resolution.patterns.iter_mut() {
                        if report.patterns_involved.contains(&pattern.id)
                            && conform(pattern, report.conflict_type, profile)
                            && !resolution.transformed.contains(&pattern.id)
                        {
                            resolution.transformed.push(pattern.id.clone());
                        }
                    }
                } else {
                    guidance.push(permissive_guidance(report.conflict_type, profile));
                }
            }
        }
    }

    guidance.dedup();
    if !guidance.is_empty() {
        let block: Vec<String> = guidance.iter().map(|g| format!("- {g}")).collect();
        resolution.prompt = format!(
            "{}\n\n{GUIDANCE_HEADER}\n{}",
            base_prompt.trim_end(),
            block.join("\n")
        );
    }
    resolution
}

/// Which tenant flag governs each conflict dimension.
fn enforced(conflict_type: ConflictType, settings: &PrioritySettings) -> bool {
    match conflict_type {
        ConflictType::LanguageStyle | ConflictType::WordChoice => settings.enforce_language_style,
        ConflictType::Personality | ConflictType::ResponseStyle => settings.enforce_personality,
    }
}

/// Rewrites a pattern to agree with the prompt. Returns whether it changed.
fn conform(pattern: &mut Pattern, conflict_type: ConflictType, profile: &PromptProfile) -> bool {
    match (&mut pattern.payload, conflict_type) {
        (PatternPayload::WordUsage(usage), ConflictType::LanguageStyle) => {
            let before = usage.successful_words.clone();
            usage.successful_words = to_formal(&usage.successful_words);
            usage.successful_words != before
        }
        (PatternPayload::EmotionalTone(tone), ConflictType::LanguageStyle) => {
            let before = tone.openers.len();
            tone.openers.retain(|o| !has_colloquial(o));
            tone.openers.len() != before
        }
        (PatternPayload::WordUsage(usage), ConflictType::WordChoice) => {
            let before = usage.successful_words.len();
            usage.successful_words.retain(|w| !profile.prohibits(w));
            usage.successful_words.len() != before
        }
        (PatternPayload::EmotionalTone(tone), ConflictType::Personality) => {
            let before = tone.clone();
            match profile.demeanor {
                Demeanor::Serious => {
                    tone.target_sentiment = tone.target_sentiment.min(SERIOUS_MAX_SENTIMENT);
                    tone.openers.clear();
                }
                Demeanor::Warm => tone.target_sentiment = tone.target_sentiment.max(0.0),
                Demeanor::Unspecified => {}
            }
            *tone != before
        }
        (PatternPayload::ResponseStyle(style), ConflictType::ResponseStyle) => {
            let before = style.clone();
            style.target_word_count = match profile.length {
                LengthPreference::Brief => style.target_word_count.min(BRIEF_MAX_WORDS),
                LengthPreference::Detailed => style.target_word_count.max(DETAILED_MIN_WORDS),
                LengthPreference::Unspecified => style.target_word_count,
            };
            if profile.no_closing_questions {
                style.ends_with_question = false;
            }
            *style != before
        }
        _ => false,
    }
}

/// Maps colloquial words to formal ones, dropping words with no substitute.
pub fn to_formal(words: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let mapped = match formal_equivalent(word) {
            Some(Some(formal)) => formal.to_string(),
            Some(None) => continue,
            None => word.clone(),
        };
        if !out.contains(&mapped) {
            out.push(mapped);
        }
    }
    out
}

fn pattern_guidance(report: &ConflictReport, patterns: &[Pattern]) -> Vec<String> {
    let involved = patterns
        .iter()
        .filter(|p| report.patterns_involved.contains(&p.id));
    match report.conflict_type {
        ConflictType::LanguageStyle | ConflictType::WordChoice => {
            let mut words: Vec<&str> = Vec::new();
            for p in involved {
                if let Some(usage) = p.word_usage() {
                    words.extend(
                        usage
                            .successful_words
                            .iter()
                            .map(String::as_str)
                            .filter(|w| report.conflict_type == ConflictType::WordChoice || is_colloquial(w)),
                    );
                } else if let Some(tone) = p.emotional_tone() {
                    if report.conflict_type == ConflictType::LanguageStyle {
                        words.extend(tone.openers.iter().map(String::as_str).filter(|o| has_colloquial(o)));
                    }
                }
            }
            if words.is_empty() {
                return Vec::new();
            }
            vec![format!(
                "Words such as {} have worked well with customers; use them where natural.",
                words.join("، ")
            )]
        }
        ConflictType::Personality => {
            let mut lines: Vec<String> = involved
                .filter_map(|p| p.emotional_tone())
                .map(|t| tone_guidance(t.target_sentiment).to_string())
                .collect();
            lines.dedup();
            lines
        }
        ConflictType::ResponseStyle => involved
            .filter_map(|p| p.response_style())
            .map(|s| {
                let closing = if s.ends_with_question { " ending with a question" } else { "" };
                format!(
                    "Replies of about {} words{closing} have worked well with customers.",
                    s.target_word_count
                )
            })
            .collect(),
    }
}

/// Describes the tone a pattern targets, in the direction it pulls.
fn tone_guidance(target_sentiment: f32) -> &'static str {
    if target_sentiment >= 0.5 {
        "A warm, upbeat tone has worked well with customers."
    } else if target_sentiment >= 0.0 {
        "A friendly but measured tone has worked well with customers."
    } else {
        "A calm, subdued tone has worked well with customers."
    }
}

fn permissive_guidance(conflict_type: ConflictType, profile: &PromptProfile) -> String {
    match conflict_type {
        ConflictType::LanguageStyle => {
            "Formal Arabic is preferred, but colloquial words are fine when the customer writes colloquially."
                .to_string()
        }
        ConflictType::Personality => format!(
            "Keep the {} persona, but match the customer's mood when they are upbeat.",
            profile.demeanor
        ),
        ConflictType::ResponseStyle => {
            "Follow the preferred reply length, but adapt when the customer asks for more or less detail."
                .to_string()
        }
        ConflictType::WordChoice => {
            "Respect the word restrictions above unless the customer uses those words first."
                .to_string()
        }
    }
}
