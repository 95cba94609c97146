// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexical markers used by the detectors.

/// Egyptian colloquial words, paired with their formal equivalent.
/// `None` means there is no safe formal substitute and the word is removed.
pub const COLLOQUIAL_TO_FORMAL: &[(&str, Option<&str>)] = &[
    ("كويس", Some("جيد")),
    ("كويسة", Some("جيدة")),
    ("ازيك", Some("كيف حالك")),
    ("إزيك", Some("كيف حالك")),
    ("عايز", Some("تريد")),
    ("عاوز", Some("تريد")),
    ("عايزة", Some("تريدين")),
    ("ازاي", Some("كيف")),
    ("إزاي", Some("كيف")),
    ("دلوقتي", Some("الآن")),
    ("اوي", Some("جداً")),
    ("أوي", Some("جداً")),
    ("ايه", Some("ماذا")),
    ("إيه", Some("ماذا")),
    ("بيك", Some("بك")),
    ("شوية", Some("قليلاً")),
    ("مش", None),
    ("بتاع", None),
    ("خالص", None),
    ("يا باشا", None),
];

/// Markers of a formal-register requirement in a personality prompt.
pub const FORMAL_MARKERS: &[&str] = &[
    "فصحى",
    "الفصحى",
    "يرجى",
    "حضرتكم",
    "سيادتكم",
    "رسمي",
    "رسمية",
    "formal",
];

/// Markers of a colloquial-register requirement in a personality prompt.
pub const COLLOQUIAL_MARKERS: &[&str] = &["عامية", "العامية", "مصري", "colloquial", "casual", "dialect"];

pub const SERIOUS_TRAITS: &[&str] = &["جاد", "رسمي", "محترف", "وقور", "professional", "serious"];

pub const WARM_TRAITS: &[&str] = &["ودود", "مرح", "بشوش", "متحمس", "friendly", "cheerful", "enthusiastic"];

pub const BRIEF_MARKERS: &[&str] = &["مختصر", "باختصار", "قصير", "brief", "concise", "short"];

pub const DETAILED_MARKERS: &[&str] = &["مفصل", "بالتفصيل", "detailed", "thorough"];

/// Phrases that introduce a list of words the agent must not use.
pub const PROHIBITION_MARKERS: &[&str] = &[
    "لا تستخدم",
    "لا تقل",
    "تجنب",
    "ممنوع",
    "avoid",
    "don't use",
    "do not use",
    "never use",
    "never say",
];

/// Phrases asking the agent not to close replies with a question.
pub const QUESTION_BAN_MARKERS: &[&str] = &[
    "بدون أسئلة",
    "دون أسئلة",
    "لا تختم بسؤال",
    "لا تنهي بسؤال",
    "لا تسأل العميل",
    "no questions",
    "no follow-up questions",
    "without questions",
    "don't end with a question",
    "do not end with a question",
    "don't ask questions",
    "do not ask questions",
];

/// Words that, inside a prohibition clause, ban questions.
pub const QUESTION_WORDS: &[&str] = &["سؤال", "أسئلة", "اسئلة", "question", "questions"];

/// Formal equivalent of a colloquial word. `Some(None)` means the word is
/// colloquial but has no substitute; `None` means it is not colloquial.
pub fn formal_equivalent(word: &str) -> Option<Option<&'static str>> {
    COLLOQUIAL_TO_FORMAL
        .iter()
        .find(|(colloquial, _)| *colloquial == word.trim())
        .map(|(_, formal)| *formal)
}

pub fn is_colloquial(word: &str) -> bool {
    formal_equivalent(word).is_some()
}

/// Whether any colloquial word or phrase appears in free text.
pub fn has_colloquial(text: &str) -> bool {
    COLLOQUIAL_TO_FORMAL
        .iter()
        .any(|(colloquial, _)| mentions(text, colloquial))
}

/// Attached Arabic prefixes (conjunctions, prepositions, article).
const PROCLITICS: &[&str] = &[
    "و", "ف", "ب", "ل", "ك", "ال", "بال", "وال", "فال", "كال", "لل", "وب", "ول", "فب",
];

/// Case-insensitive whole-token or phrase containment. A token carrying an
/// Arabic proclitic still matches, so `بالفصحى` mentions `فصحى`.
pub fn mentions(text: &str, marker: &str) -> bool {
    let text = text.to_lowercase();
    let marker = marker.to_lowercase();
    if marker.contains(|c: char| !c.is_alphanumeric()) {
        return text.contains(&marker);
    }
    text.split(|c: char| !c.is_alphanumeric()).any(|token| {
        token == marker
            || token
                .strip_suffix(marker.as_str())
                .is_some_and(|prefix| PROCLITICS.contains(&prefix))
    })
}

/// First line of `text` mentioning any marker, trimmed to `max_chars`.
pub fn excerpt(text: &str, markers: &[&str], max_chars: usize) -> String {
    text.lines()
        .find(|line| markers.iter().any(|m| mentions(line, m)))
        .unwrap_or("")
        .trim()
        .chars()
        .take(max_chars)
        .collect()
}
