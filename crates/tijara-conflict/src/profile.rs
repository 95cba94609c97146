// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! What a personality prompt asks for, as far as the detectors care.

use strum::Display;

use crate::lexicon::{
    BRIEF_MARKERS, COLLOQUIAL_MARKERS, DETAILED_MARKERS, FORMAL_MARKERS, PROHIBITION_MARKERS,
    QUESTION_BAN_MARKERS, QUESTION_WORDS, SERIOUS_TRAITS, WARM_TRAITS, mentions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    Formal,
    Colloquial,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Demeanor {
    Serious,
    Warm,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LengthPreference {
    Brief,
    Detailed,
    Unspecified,
}

/// Longest reply a brief prompt tolerates, in words.
pub const BRIEF_MAX_WORDS: u32 = 40;
/// Shortest reply a detailed prompt tolerates, in words.
pub const DETAILED_MIN_WORDS: u32 = 20;
/// Highest tone target a serious prompt tolerates.
pub const SERIOUS_MAX_SENTIMENT: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct PromptProfile {
    pub register: Register,
    pub demeanor: Demeanor,
    pub length: LengthPreference,
    /// The prompt forbids closing a reply with a question.
    pub no_closing_questions: bool,
    /// Clauses following a prohibition such as "لا تستخدم" or "avoid".
    pub prohibited: Vec<String>,
}

impl PromptProfile {
    pub fn analyse(prompt: &str) -> Self {
        let lowered = prompt.to_lowercase();
        let mut permitted = String::new();
        let mut prohibited = Vec::new();

        for clause in lowered.split(['\n', '.', '!', '?', '؟', ';', '؛', '،', ',']) {
            let marker_at = PROHIBITION_MARKERS
                .iter()
                .filter_map(|m| clause.find(m).map(|at| (at, m.len())))
                .min();
            match marker_at {
                Some((at, len)) => {
                    permitted.push_str(&clause[..at]);
                    let rest = clause[at + len..].trim_matches(|c: char| c.is_whitespace() || c == ':');
                    if !rest.is_empty() {
                        prohibited.push(rest.to_string());
                    }
                }
                None => permitted.push_str(clause),
            }
            permitted.push('\n');
        }

        let any = |text: &str, markers: &[&str]| markers.iter().any(|m| mentions(text, m));
        let banned = |markers: &[&str]| prohibited.iter().any(|p| any(p, markers));

        // Banning one register is a request for the other.
        let formal = any(&permitted, FORMAL_MARKERS) || banned(COLLOQUIAL_MARKERS);
        let colloquial = any(&permitted, COLLOQUIAL_MARKERS) || banned(FORMAL_MARKERS);
        let register = match (formal, colloquial) {
            (true, false) => Register::Formal,
            (false, true) => Register::Colloquial,
            _ => Register::Unspecified,
        };

        let demeanor = match (any(&permitted, SERIOUS_TRAITS), any(&permitted, WARM_TRAITS)) {
            (true, false) => Demeanor::Serious,
            (false, true) => Demeanor::Warm,
            _ => Demeanor::Unspecified,
        };

        let length = match (any(&permitted, BRIEF_MARKERS), any(&permitted, DETAILED_MARKERS)) {
            (true, false) => LengthPreference::Brief,
            (false, true) => LengthPreference::Detailed,
            _ => LengthPreference::Unspecified,
        };

        let no_closing_questions = any(&lowered, QUESTION_BAN_MARKERS) || banned(QUESTION_WORDS);

        Self {
            register,
            demeanor,
            length,
            no_closing_questions,
            prohibited,
        }
    }

    pub fn prohibits(&self, word: &str) -> bool {
        self.prohibited.iter().any(|clause| mentions(clause, word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formal_prompt() {
        let p = PromptProfile::analyse("أنت مساعد محترف لمتجر أحذية. تحدث باللغة العربية الفصحى فقط.");
        assert_eq!(p.register, Register::Formal);
        assert_eq!(p.demeanor, Demeanor::Serious);
        assert_eq!(p.length, LengthPreference::Unspecified);
    }

    #[test]
    fn banning_colloquial_means_formal() {
        let p = PromptProfile::analyse("لا تستخدم العامية أبداً");
        assert_eq!(p.register, Register::Formal);
        assert_eq!(p.prohibited, vec!["العامية أبداً".to_string()]);
    }

    #[test]
    fn colloquial_friendly_brief_prompt() {
        let p = PromptProfile::analyse("You are a friendly shop assistant. Speak Egyptian colloquial Arabic and keep answers short.");
        assert_eq!(p.register, Register::Colloquial);
        assert_eq!(p.demeanor, Demeanor::Warm);
        assert_eq!(p.length, LengthPreference::Brief);
    }

    #[test]
    fn prohibited_words_are_found() {
        let p = PromptProfile::analyse("Be helpful. Never say cheap or discount.\nتجنب كلمة مستحيل");
        assert!(p.prohibits("cheap"));
        assert!(p.prohibits("discount"));
        assert!(p.prohibits("مستحيل"));
        assert!(!p.prohibits("helpful"));
    }

    #[test]
    fn empty_prompt_is_unspecified() {
        let p = PromptProfile::analyse("");
        assert_eq!(p.register, Register::Unspecified);
        assert!(!p.no_closing_questions);
        assert!(p.prohibited.is_empty());
    }

    #[test]
    fn question_bans_are_found() {
        assert!(PromptProfile::analyse("Answer directly. Do not end with a question.").no_closing_questions);
        assert!(PromptProfile::analyse("أجب بدون أسئلة.").no_closing_questions);
        assert!(PromptProfile::analyse("تجنب الأسئلة في نهاية الرد").no_closing_questions);
        assert!(PromptProfile::analyse("Avoid follow-up questions.").no_closing_questions);
        assert!(!PromptProfile::analyse("Answer every question politely.").no_closing_questions);
    }
}
