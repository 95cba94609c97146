// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword intent and sentiment signals for a customer message.
//!
//! The intent labels feed retrieval and pattern guidance; the sentiment
//! score conditions the response optimizer and learning.

use strum::{Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Greeting,
    PriceInquiry,
    ProductInquiry,
    Shipping,
    Complaint,
    General,
}

/// Checked in order; the first intent with a matching keyword wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Complaint,
        &["مشكلة", "مشكله", "وحش", "اتأخر", "متأخر", "زعلان", "مرتجع", "استرجاع", "complaint", "refund"],
    ),
    (
        Intent::PriceInquiry,
        &["بكام", "سعر", "السعر", "كام", "خصم", "عرض", "price", "cost", "discount"],
    ),
    (
        Intent::Shipping,
        &["شحن", "الشحن", "توصيل", "التوصيل", "يوصل", "delivery", "shipping"],
    ),
    (
        Intent::ProductInquiry,
        &["عندكم", "متوفر", "مقاس", "مقاسات", "لون", "الوان", "ألوان", "موديل", "available", "size", "color"],
    ),
    (
        Intent::Greeting,
        &["اهلا", "أهلا", "مرحبا", "السلام", "صباح", "مساء", "ازيك", "hello", "hi"],
    ),
];

const POSITIVE: &[&str] = &[
    "شكرا", "شكراً", "تمام", "حلو", "جميل", "ممتاز", "رائع", "كويس", "تسلم", "حبيت", "thanks", "great",
    "perfect", "love",
];

const NEGATIVE: &[&str] = &[
    "وحش", "سيء", "زعلان", "مشكلة", "مشكله", "غالي", "متأخر", "اتأخر", "للأسف", "bad", "angry",
    "terrible", "late",
];

/// Classified signals for one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageSignals {
    pub intent: Intent,
    /// In `[-1.0, 1.0]`; `0.0` when no sentiment words appear.
    pub sentiment: f32,
}

pub fn classify(message: &str) -> MessageSignals {
    let tokens = tokens(message);
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

    let intent = INTENT_KEYWORDS
        .iter()
        .find(|(_, words)| has(words))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General);

    let positive = tokens.iter().filter(|t| POSITIVE.contains(&t.as_str())).count() as f32;
    let negative = tokens.iter().filter(|t| NEGATIVE.contains(&t.as_str())).count() as f32;
    let sentiment = if positive + negative == 0.0 {
        0.0
    } else {
        ((positive - negative) / (positive + negative)).clamp(-1.0, 1.0)
    };

    MessageSignals { intent, sentiment }
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
