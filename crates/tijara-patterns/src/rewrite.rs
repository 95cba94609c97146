// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text rewrites used when optimizing a generated response.
//!
//! Every rewrite returns `None` when it has nothing to do, and applying a
//! rewrite to its own output is a no-op.

use regex::Regex;
use tracing::warn;

/// Which wording tables a rewrite may draw from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phrasing {
    /// Everyday Egyptian dialect.
    #[default]
    Everyday,
    /// Modern Standard Arabic only. Nothing colloquial is inserted.
    Formal,
}

impl Phrasing {
    fn failure_replacements(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Phrasing::Everyday => FAILURE_REPLACEMENTS,
            Phrasing::Formal => FORMAL_FAILURE_REPLACEMENTS,
        }
    }

    fn default_openers(self) -> &'static [&'static str] {
        match self {
            Phrasing::Everyday => DEFAULT_OPENERS,
            Phrasing::Formal => FORMAL_OPENERS,
        }
    }
}

/// Phrases that correlate with lost sales, and what to say instead.
pub const FAILURE_REPLACEMENTS: &[(&str, &str)] = &[
    ("مش عارف", "هتأكد لحضرتك"),
    ("لا أعرف", "سأتأكد لك"),
    ("مستحيل", "صعب شوية"),
    ("لا يمكن", "سنحاول"),
    ("للأسف", "حالياً"),
    ("مفيش", "هيتوفر قريب"),
    ("غير متوفر", "هيتوفر قريب"),
    ("مشكلة", "نقطة بسيطة"),
    ("انتظر", "لحظات من فضلك"),
];

/// The same replacements in standard Arabic.
pub const FORMAL_FAILURE_REPLACEMENTS: &[(&str, &str)] = &[
    ("مش عارف", "سأتأكد لك"),
    ("لا أعرف", "سأتأكد لك"),
    ("مستحيل", "يصعب"),
    ("لا يمكن", "سنحاول"),
    ("للأسف", "حالياً"),
    ("مفيش", "سيتوفر قريباً"),
    ("غير متوفر", "سيتوفر قريباً"),
    ("مشكلة", "نقطة بسيطة"),
    ("انتظر", "لحظات من فضلك"),
];

/// Openers used when a tone pattern does not bring its own.
pub const DEFAULT_OPENERS: &[&str] = &["أهلاً بيك!", "أكيد!", "يسعدنا تواصلك!"];

pub const FORMAL_OPENERS: &[&str] = &["أهلاً وسهلاً بك!", "بكل سرور!", "يسعدنا تواصلك!"];

/// Closing question appended when the preferred structure ends with one.
pub const FOLLOW_UP_QUESTION: &str = "هل يمكنني مساعدتك في شيء آخر؟";

/// Sentence appended when a reply is far below its target length.
pub const EXPANSION_SENTENCE: &str = "يسعدني مساعدتك في اختيار ما يناسبك.";

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_arabic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

/// Whole-word (or whole-phrase) containment.
pub fn contains_word(text: &str, word: &str) -> bool {
    let word = word.trim();
    if word.is_empty() {
        return false;
    }
    if word.contains(char::is_whitespace) {
        return text.contains(word);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Swaps configured failure words for their table replacement.
///
/// Words without a table entry are left alone.
pub fn replace_failure_words(
    text: &str,
    failure_words: &[String],
    phrasing: Phrasing,
) -> Option<String> {
    let table = phrasing.failure_replacements();
    let mut out = text.to_string();
    let mut changed = false;
    for word in failure_words {
        let Some((_, replacement)) = table.iter().find(|(w, _)| w == word) else {
            continue;
        };
        let re = match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
            Ok(re) => re,
            Err(e) => {
                warn!(word = %word, error = %e, "skipping failure word");
                continue;
            }
        };
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).into_owned();
            changed = true;
        }
    }
    changed.then_some(out)
}

/// Leads the reply with `word` unless it already appears.
pub fn insert_word(text: &str, word: &str) -> Option<String> {
    let word = word.trim();
    if word.is_empty() || contains_word(text, word) {
        return None;
    }
    let separator = if is_arabic(word) { "،" } else { "," };
    Some(format!("{word}{separator} {}", text.trim_start()))
}

/// Splits on sentence terminators, keeping them. A `.` inside a number is
/// not a terminator.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let terminal = match c {
            '!' | '?' | '؟' | '\n' => true,
            '.' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if terminal {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Moves a reply toward `target` words.
///
/// Sentences this function appended earlier are set aside before measuring,
/// so its output is a fixed point. Replies over 1.5x the target are
/// condensed by dropping whole trailing sentences; the first sentence is
/// always kept, along with the next one when it is only a short greeting.
/// Replies under 0.6x get one expansion sentence. A closing question is
/// added when requested and the reply has none.
pub fn fit_length(text: &str, target: u32, ends_with_question: bool) -> Option<String> {
    let original = text.trim();
    let target = target as usize;

    let mut body = original;
    loop {
        let before = body.len();
        for appended in [FOLLOW_UP_QUESTION, EXPANSION_SENTENCE] {
            if let Some(rest) = body.strip_suffix(appended) {
                body = rest.trim_end();
            }
        }
        if body.len() == before {
            break;
        }
    }

    let mut body = body.to_string();
    if word_count(&body) * 2 > target * 3 {
        let mut kept: Vec<&str> = Vec::new();
        let mut count = 0;
        for sentence in split_sentences(&body) {
            let n = word_count(sentence);
            if !kept.is_empty() && count >= 3 && count + n > target {
                break;
            }
            kept.push(sentence);
            count += n;
        }
        body = kept.join(" ");
    }

    let mut parts = vec![body];
    if word_count(&parts[0]) * 10 < target * 6 {
        parts.push(EXPANSION_SENTENCE.to_string());
    }
    if ends_with_question && !parts[0].contains('?') && !parts[0].contains('؟') {
        parts.push(FOLLOW_UP_QUESTION.to_string());
    }
    parts.retain(|p| !p.is_empty());
    let out = parts.join(" ");

    (out != original).then_some(out)
}

/// Prepends the first opener unless the reply already opens with any of them.
pub fn prepend_opener(text: &str, openers: &[String], phrasing: Phrasing) -> Option<String> {
    let trimmed = text.trim_start();
    let mut candidates = openers
        .iter()
        .map(String::as_str)
        .chain(phrasing.default_openers().iter().copied());
    if candidates.clone().any(|o| trimmed.starts_with(o)) {
        return None;
    }
    let opener = candidates.next()?;
    Some(format!("{opener} {trimmed}"))
}
