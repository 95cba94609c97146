// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field extraction from free-form customer messages.

use std::sync::LazyLock;

use regex::Regex;
use tijara_core::{Interaction, ProductMention};

static PHONE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d \-]{7,15}\d").unwrap());

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3})\s*(?:قطع|قطعة|حبات|حبة|جوز|pieces|pcs|x)\b").unwrap()
});

const NAME_MARKERS: &[&str] = &["انا اسمي", "أنا اسمي", "اسمي", "الاسم", "my name is", "name:"];
const ADDRESS_MARKERS: &[&str] = &["عنواني", "العنوان", "my address is", "address:"];

/// Markers that end a name or address value.
const FIELD_MARKERS: &[&str] = &[
    "رقمي", "رقم", "موبايلي", "تليفوني", "عنواني", "العنوان", "اسمي", "الاسم", "phone", "address",
];

const CITIES: &[(&str, &str)] = &[
    ("القاهرة", "القاهرة"),
    ("الجيزة", "الجيزة"),
    ("الإسكندرية", "الإسكندرية"),
    ("الاسكندرية", "الإسكندرية"),
    ("اسكندرية", "الإسكندرية"),
    ("المنصورة", "المنصورة"),
    ("طنطا", "طنطا"),
    ("الزقازيق", "الزقازيق"),
    ("أسيوط", "أسيوط"),
    ("اسيوط", "أسيوط"),
    ("الأقصر", "الأقصر"),
    ("أسوان", "أسوان"),
    ("اسوان", "أسوان"),
    ("بورسعيد", "بورسعيد"),
    ("السويس", "السويس"),
    ("الإسماعيلية", "الإسماعيلية"),
    ("الاسماعيلية", "الإسماعيلية"),
    ("دمياط", "دمياط"),
    ("الفيوم", "الفيوم"),
    ("بني سويف", "بني سويف"),
    ("المنيا", "المنيا"),
    ("سوهاج", "سوهاج"),
    ("الغردقة", "الغردقة"),
    ("6 أكتوبر", "6 أكتوبر"),
    ("cairo", "القاهرة"),
    ("giza", "الجيزة"),
    ("alexandria", "الإسكندرية"),
];

/// Customer fields found in one message. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub city: Option<String>,
    pub quantity: Option<u32>,
}

impl ExtractedFields {
    /// Overwrites fields with any value present in `later`.
    pub fn merge(&mut self, later: ExtractedFields) {
        if later.customer_name.is_some() {
            self.customer_name = later.customer_name;
        }
        if later.customer_phone.is_some() {
            self.customer_phone = later.customer_phone;
        }
        if later.customer_address.is_some() {
            self.customer_address = later.customer_address;
        }
        if later.city.is_some() {
            self.city = later.city;
        }
        if later.quantity.is_some() {
            self.quantity = later.quantity;
        }
    }
}

/// Maps Arabic-Indic and Persian digits to ASCII.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            _ => c,
        })
        .collect()
}

pub fn extract_fields(message: &str) -> ExtractedFields {
    let text = normalize_digits(message);
    ExtractedFields {
        customer_name: extract_name(&text),
        customer_phone: extract_phone(&text),
        customer_address: extract_after_marker(&text, ADDRESS_MARKERS, &['\n', '.']),
        city: extract_city(&text),
        quantity: extract_quantity(&text),
    }
}

/// Egyptian numbers: local `0…` with 10 or 11 digits, or `+20…`/`20…`.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_CANDIDATE.find_iter(text).find_map(|m| {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        let local = if let Some(rest) = digits.strip_prefix("20").filter(|r| r.len() == 10) {
            format!("0{rest}")
        } else if digits.starts_with('1') && digits.len() == 10 {
            format!("0{digits}")
        } else {
            digits
        };
        (local.starts_with('0') && (10..=11).contains(&local.len())).then_some(local)
    })
}

pub fn extract_name(text: &str) -> Option<String> {
    let name = extract_after_marker(text, NAME_MARKERS, &['\n', '.', '،', ',', '؛'])?;
    let words: Vec<&str> = name
        .split_whitespace()
        .take_while(|w| !w.chars().any(|c| c.is_ascii_digit()))
        .take(4)
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

pub fn extract_city(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    CITIES
        .iter()
        .find(|(alias, _)| lowered.contains(alias))
        .map(|(_, canonical)| canonical.to_string())
}

pub fn extract_quantity(text: &str) -> Option<u32> {
    let caps = QUANTITY.captures(text)?;
    caps.get(1)?.as_str().parse().ok().filter(|q| *q > 0)
}

/// Text after the first marker, up to a terminator or the next field marker.
///
/// Markers match case-insensitively; the value keeps its original case.
fn extract_after_marker(text: &str, markers: &[&str], terminators: &[char]) -> Option<String> {
    let lowered = text.to_lowercase();
    let (at, len) = markers
        .iter()
        .filter_map(|m| lowered.find(m).map(|at| (at, m.len())))
        .min_by_key(|(at, len)| (*at, std::cmp::Reverse(*len)))?;
    let rest = lowered.get(at + len..)?;
    let start = at + len + (rest.len() - rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':').len());
    let rest = lowered.get(start..)?;

    let mut end = rest.find(terminators).unwrap_or(rest.len());
    for marker in FIELD_MARKERS {
        if let Some(mut found) = rest[..end].find(marker) {
            // An attached conjunction belongs to the next field: "ورقمي".
            if rest[..found].ends_with('و') {
                found -= 'و'.len_utf8();
            }
            end = end.min(found);
        }
    }

    let source = if lowered.len() == text.len() { text } else { lowered.as_str() };
    let value = source
        .get(start..start + end)
        .or_else(|| lowered.get(start..start + end))?
        .trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Most recent product mention within the last `lookback` interactions.
pub fn find_product(history: &[Interaction], lookback: usize) -> Option<ProductMention> {
    history
        .iter()
        .rev()
        .take(lookback)
        .find_map(|i| i.mentioned_products.first().cloned())
}
