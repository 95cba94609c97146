// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Purchase confirmation and cancellation heuristics.
//!
//! All matching is on whole tokens, so "cancellation" never reads as
//! "cancel" and "okayish" never reads as "okay".

/// Words that commit to buying on their own.
const PURCHASE_WORDS: &[&str] = &[
    "موافق", "هاخده", "هاخدها", "هاخد", "اطلبه", "اطلبها", "أطلبه", "احجزه", "احجزها", "confirm",
];

/// Agreement that only confirms when a product was just discussed.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "تمام", "ماشي", "خلاص", "ايوه", "أيوه", "اكيد", "أكيد", "ok", "okay", "yes",
];

const PURCHASE_PHRASES: &[&str] = &["عايز اطلب", "عايزة اطلب", "هطلب", "i'll take it", "i will take it"];

const NEGATIVE: &[&str] = &["لا", "لأ", "مش", "بلاش", "no", "not", "cancel"];

const CANCEL_WORDS: &[&str] = &["بلاش", "cancel", "الغيه", "ألغيه", "الغيها"];

const CANCEL_PHRASES: &[&str] = &[
    "الغي الطلب",
    "ألغي الطلب",
    "إلغاء الطلب",
    "الغاء الطلب",
    "مش عايز",
    "مش عايزة",
    "cancel it",
    "cancel the order",
    "cancel my order",
];

/// How strongly a message commits to a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// A purchase verb such as "هاخده" or "i'll take it".
    Explicit,
    /// Bare agreement such as "تمام" or "ok".
    Acknowledgement,
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Phrase containment on token boundaries.
fn has_phrase(tokens: &[String], phrase: &str) -> bool {
    let joined = format!(" {} ", tokens.join(" "));
    joined.contains(&format!(" {phrase} "))
}

fn is_question(message: &str) -> bool {
    let trimmed = message.trim_end();
    trimmed.ends_with('?') || trimmed.ends_with('؟')
}

/// Classifies affirmative language, ignoring anything negated.
///
/// A bare acknowledgement asked as a question ("تمام؟") is not agreement.
/// Does not check for a discussed product; the caller ties the two together.
pub fn classify_confirmation(message: &str) -> Option<Confirmation> {
    let tokens = tokens(message);
    if tokens.iter().any(|t| NEGATIVE.contains(&t.as_str())) {
        return None;
    }
    let explicit = tokens.iter().any(|t| PURCHASE_WORDS.contains(&t.as_str()))
        || PURCHASE_PHRASES.iter().any(|p| has_phrase(&tokens, p));
    if explicit {
        return Some(Confirmation::Explicit);
    }
    let acknowledged = tokens.iter().any(|t| ACKNOWLEDGEMENTS.contains(&t.as_str()));
    (acknowledged && !is_question(message)).then_some(Confirmation::Acknowledgement)
}

pub fn is_confirmation(message: &str) -> bool {
    classify_confirmation(message).is_some()
}

/// Explicit cancellation. Asking about a single cancel word ("can I cancel
/// later?") does not cancel.
pub fn is_cancellation(message: &str) -> bool {
    let tokens = tokens(message);
    if CANCEL_PHRASES.iter().any(|p| has_phrase(&tokens, p)) {
        return true;
    }
    !is_question(message) && tokens.iter().any(|t| CANCEL_WORDS.contains(&t.as_str()))
}
