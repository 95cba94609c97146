// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four conflict detectors and severity aggregation.

use tijara_core::{ConflictType, PatternId, Severity};
use tijara_patterns::Pattern;

use crate::lexicon::{
    BRIEF_MARKERS, DETAILED_MARKERS, FORMAL_MARKERS, PROHIBITION_MARKERS, QUESTION_BAN_MARKERS,
    SERIOUS_TRAITS, WARM_TRAITS, excerpt, has_colloquial, is_colloquial,
};
use crate::profile::{
    BRIEF_MAX_WORDS, DETAILED_MIN_WORDS, Demeanor, LengthPreference, PromptProfile, Register,
    SERIOUS_MAX_SENTIMENT,
};

const EXCERPT_CHARS: usize = 120;

/// One detector's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub conflict_type: ConflictType,
    pub has_conflict: bool,
    pub severity: Severity,
    pub description: String,
    pub patterns: Vec<PatternId>,
    pub excerpt: String,
}

impl Detection {
    fn clear(conflict_type: ConflictType) -> Self {
        Self {
            conflict_type,
            has_conflict: false,
            severity: Severity::Low,
            description: String::new(),
            patterns: Vec::new(),
            excerpt: String::new(),
        }
    }
}

pub trait Detector: Send + Sync {
    fn conflict_type(&self) -> ConflictType;

    fn detect(&self, prompt: &str, profile: &PromptProfile, patterns: &[Pattern]) -> Detection;
}

/// Formal prompt against patterns that favour colloquial words or openers.
pub struct LanguageStyleDetector;

impl Detector for LanguageStyleDetector {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::LanguageStyle
    }

    fn detect(&self, prompt: &str, profile: &PromptProfile, patterns: &[Pattern]) -> Detection {
        let mut out = Detection::clear(self.conflict_type());
        if profile.register != Register::Formal {
            return out;
        }
        let mut words: Vec<&str> = Vec::new();
        for p in patterns {
            let colloquial: Vec<&str> = if let Some(usage) = p.word_usage() {
                usage
                    .successful_words
                    .iter()
                    .map(String::as_str)
                    .filter(|w| is_colloquial(w))
                    .collect()
            } else if let Some(tone) = p.emotional_tone() {
                tone.openers
                    .iter()
                    .map(String::as_str)
                    .filter(|o| has_colloquial(o))
                    .collect()
            } else {
                continue;
            };
            if !colloquial.is_empty() {
                out.patterns.push(p.id.clone());
                words.extend(colloquial);
            }
        }
        if words.is_empty() {
            return out;
        }
        out.has_conflict = true;
        out.severity = if words.len() >= 2 {
            Severity::High
        } else {
            Severity::Medium
        };
        out.description = format!(
            "prompt requires formal Arabic but patterns favour colloquial words: {}",
            words.join("، ")
        );
        out.excerpt = excerpt(prompt, FORMAL_MARKERS, EXCERPT_CHARS);
        out
    }
}

/// Prompt personality against emotional-tone patterns.
pub struct PersonalityDetector;

impl Detector for PersonalityDetector {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::Personality
    }

    fn detect(&self, prompt: &str, profile: &PromptProfile, patterns: &[Pattern]) -> Detection {
        let mut out = Detection::clear(self.conflict_type());
        let mut worst = Severity::Low;
        for p in patterns {
            let Some(tone) = p.emotional_tone() else { continue };
            let severity = match profile.demeanor {
                Demeanor::Serious if tone.target_sentiment >= 0.8 => Some(Severity::High),
                Demeanor::Serious
                    if tone.target_sentiment > SERIOUS_MAX_SENTIMENT || !tone.openers.is_empty() =>
                {
                    Some(Severity::Medium)
                }
                Demeanor::Warm if tone.target_sentiment < 0.0 => Some(Severity::Low),
                _ => None,
            };
            if let Some(severity) = severity {
                worst = worst.max(severity);
                out.patterns.push(p.id.clone());
            }
        }
        if out.patterns.is_empty() {
            return out;
        }
        out.has_conflict = true;
        out.severity = worst;
        out.description = match profile.demeanor {
            Demeanor::Serious => "prompt asks for a serious persona but patterns push an upbeat tone",
            _ => "prompt asks for a warm persona but patterns push a subdued tone",
        }
        .to_string();
        let markers = if profile.demeanor == Demeanor::Serious {
            SERIOUS_TRAITS
        } else {
            WARM_TRAITS
        };
        out.excerpt = excerpt(prompt, markers, EXCERPT_CHARS);
        out
    }
}

/// Prompt length and closing preferences against response-style targets.
pub struct ResponseStyleDetector;

impl Detector for ResponseStyleDetector {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::ResponseStyle
    }

    fn detect(&self, prompt: &str, profile: &PromptProfile, patterns: &[Pattern]) -> Detection {
        let mut out = Detection::clear(self.conflict_type());
        let mut worst = Severity::Low;
        let mut length_clash = false;
        let mut question_clash = false;
        for p in patterns {
            let Some(style) = p.response_style() else { continue };
            let target = style.target_word_count;
            let length = match profile.length {
                LengthPreference::Brief if target > BRIEF_MAX_WORDS * 2 => Some(Severity::High),
                LengthPreference::Brief if target > BRIEF_MAX_WORDS => Some(Severity::Medium),
                LengthPreference::Detailed if target < DETAILED_MIN_WORDS => Some(Severity::Medium),
                _ => None,
            };
            let question = (profile.no_closing_questions && style.ends_with_question)
                .then_some(Severity::Medium);
            length_clash |= length.is_some();
            question_clash |= question.is_some();
            if let Some(severity) = length.max(question) {
                worst = worst.max(severity);
                out.patterns.push(p.id.clone());
            }
        }
        if out.patterns.is_empty() {
            return out;
        }
        out.has_conflict = true;
        out.severity = worst;

        let mut descriptions = Vec::new();
        let mut markers: Vec<&str> = Vec::new();
        if length_clash {
            if profile.length == LengthPreference::Brief {
                descriptions.push("prompt asks for brief replies but patterns target long ones");
                markers.extend(BRIEF_MARKERS);
            } else {
                descriptions.push("prompt asks for detailed replies but patterns target short ones");
                markers.extend(DETAILED_MARKERS);
            }
        }
        if question_clash {
            descriptions.push("prompt forbids closing questions but patterns end replies with one");
            markers.extend(QUESTION_BAN_MARKERS);
            markers.extend(PROHIBITION_MARKERS);
        }
        out.description = descriptions.join("; ");
        out.excerpt = excerpt(prompt, &markers, EXCERPT_CHARS);
        out
    }
}

/// Words the prompt prohibits that patterns promote.
pub struct WordChoiceDetector;

impl Detector for WordChoiceDetector {
    fn conflict_type(&self) -> ConflictType {
        ConflictType::WordChoice
    }

    fn detect(&self, prompt: &str, profile: &PromptProfile, patterns: &[Pattern]) -> Detection {
        let mut out = Detection::clear(self.conflict_type());
        if profile.prohibited.is_empty() {
            return out;
        }
        let mut words: Vec<&str> = Vec::new();
        for p in patterns {
            let Some(usage) = p.word_usage() else { continue };
            let banned: Vec<&str> = usage
                .successful_words
                .iter()
                .map(String::as_str)
                .filter(|w| profile.prohibits(w))
                .collect();
            if !banned.is_empty() {
                out.patterns.push(p.id.clone());
                words.extend(banned);
            }
        }
        if words.is_empty() {
            return out;
        }
        out.has_conflict = true;
        out.severity = Severity::High;
        out.description = format!("patterns promote words the prompt prohibits: {}", words.join("، "));
        out.excerpt = excerpt(prompt, PROHIBITION_MARKERS, EXCERPT_CHARS);
        out
    }
}

/// Any high is high; two or more mediums are high; one medium is medium.
pub fn aggregate_severity(severities: impl IntoIterator<Item = Severity>) -> Severity {
    let mut mediums = 0;
    for s in severities {
        match s {
            Severity::High => return Severity::High,
            Severity::Medium => mediums += 1,
            Severity::Low => {}
        }
    }
    match mediums {
        0 => Severity::Low,
        1 => Severity::Medium,
        _ => Severity::High,
    }
}
