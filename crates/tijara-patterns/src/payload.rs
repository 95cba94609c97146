// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed success patterns.
//!
//! Stored payloads are untrusted JSON; [`Pattern::from_stored`] checks the
//! discriminant, deserializes the fixed schema for that type, and validates
//! ranges before anything downstream sees the pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tijara_core::{PatternId, StoredPattern, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PatternType {
    WordUsage,
    ResponseStyle,
    Timing,
    EmotionalTone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WordUsage {
    /// Words correlated with successful conversations, strongest first.
    pub successful_words: Vec<String>,
    #[serde(default)]
    pub failure_words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseStyle {
    pub target_word_count: u32,
    #[serde(default)]
    pub ends_with_question: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Timing {
    /// Hours of day (UTC, 0-23) with the most successful conversations.
    pub peak_hours: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmotionalTone {
    /// Target sentiment in `[-1.0, 1.0]`.
    pub target_sentiment: f32,
    #[serde(default)]
    pub openers: Vec<String>,
}

/// Type-specific pattern payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternPayload {
    WordUsage(WordUsage),
    ResponseStyle(ResponseStyle),
    Timing(Timing),
    EmotionalTone(EmotionalTone),
}

impl PatternPayload {
    pub fn pattern_type(&self) -> PatternType {
        match self {
            PatternPayload::WordUsage(_) => PatternType::WordUsage,
            PatternPayload::ResponseStyle(_) => PatternType::ResponseStyle,
            PatternPayload::Timing(_) => PatternType::Timing,
            PatternPayload::EmotionalTone(_) => PatternType::EmotionalTone,
        }
    }

    /// Parses and validates a stored payload for the given discriminant.
    pub fn from_raw(pattern_type: &str, raw: &serde_json::Value) -> Result<Self, PatternError> {
        let kind: PatternType = pattern_type
            .parse()
            .map_err(|_| PatternError::UnknownType(pattern_type.to_string()))?;
        let parse_err = |source| PatternError::Payload { kind, source };

        let payload = match kind {
            PatternType::WordUsage => {
                let mut p: WordUsage = serde_json::from_value(raw.clone()).map_err(parse_err)?;
                p.successful_words = clean_words(p.successful_words);
                p.failure_words = clean_words(p.failure_words);
                if p.successful_words.is_empty() {
                    return Err(PatternError::Invalid {
                        kind,
                        reason: "successfulWords is empty".to_string(),
                    });
                }
                PatternPayload::WordUsage(p)
            }
            PatternType::ResponseStyle => {
                let p: ResponseStyle = serde_json::from_value(raw.clone()).map_err(parse_err)?;
                if !(1..=1000).contains(&p.target_word_count) {
                    return Err(PatternError::Invalid {
                        kind,
                        reason: format!("targetWordCount {} out of range", p.target_word_count),
                    });
                }
                PatternPayload::ResponseStyle(p)
            }
            PatternType::Timing => {
                let p: Timing = serde_json::from_value(raw.clone()).map_err(parse_err)?;
                if p.peak_hours.is_empty() || p.peak_hours.iter().any(|h| *h > 23) {
                    return Err(PatternError::Invalid {
                        kind,
                        reason: "peakHours must be non-empty hours in 0..=23".to_string(),
                    });
                }
                PatternPayload::Timing(p)
            }
            PatternType::EmotionalTone => {
                let mut p: EmotionalTone =
                    serde_json::from_value(raw.clone()).map_err(parse_err)?;
                if !(-1.0..=1.0).contains(&p.target_sentiment) {
                    return Err(PatternError::Invalid {
                        kind,
                        reason: format!("targetSentiment {} out of range", p.target_sentiment),
                    });
                }
                p.openers = clean_words(p.openers);
                PatternPayload::EmotionalTone(p)
            }
        };
        Ok(payload)
    }

    pub fn to_raw(&self) -> serde_json::Value {
        let value = match self {
            PatternPayload::WordUsage(p) => serde_json::to_value(p),
            PatternPayload::ResponseStyle(p) => serde_json::to_value(p),
            PatternPayload::Timing(p) => serde_json::to_value(p),
            PatternPayload::EmotionalTone(p) => serde_json::to_value(p),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

fn clean_words(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for w in words {
        let w = w.trim().to_string();
        if !w.is_empty() && !out.contains(&w) {
            out.push(w);
        }
    }
    out
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unknown pattern type `{0}`")]
    UnknownType(String),

    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: PatternType,
        source: serde_json::Error,
    },

    #[error("invalid {kind} payload: {reason}")]
    Invalid { kind: PatternType, reason: String },
}

/// An approved success pattern with a validated payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub id: PatternId,
    pub tenant_id: TenantId,
    pub payload: PatternPayload,
    pub success_rate: f32,
    pub sample_size: u32,
}

impl Pattern {
    pub fn pattern_type(&self) -> PatternType {
        self.payload.pattern_type()
    }

    pub fn from_stored(stored: &StoredPattern) -> Result<Self, PatternError> {
        Ok(Self {
            id: stored.id.clone(),
            tenant_id: stored.tenant_id.clone(),
            payload: PatternPayload::from_raw(&stored.pattern_type, &stored.payload)?,
            success_rate: stored.success_rate.clamp(0.0, 1.0),
            sample_size: stored.sample_size,
        })
    }

    /// A newly discovered row: not approved, not active.
    pub fn to_discovered(&self, discovered_at: DateTime<Utc>) -> StoredPattern {
        StoredPattern {
            id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            pattern_type: self.pattern_type().to_string(),
            payload: self.payload.to_raw(),
            success_rate: self.success_rate,
            sample_size: self.sample_size,
            is_approved: false,
            is_active: false,
            discovered_at,
        }
    }

    pub fn word_usage(&self) -> Option<&WordUsage> {
        match &self.payload {
            PatternPayload::WordUsage(p) => Some(p),
            _ => None,
        }
    }

    pub fn response_style(&self) -> Option<&ResponseStyle> {
        match &self.payload {
            PatternPayload::ResponseStyle(p) => Some(p),
            _ => None,
        }
    }

    pub fn timing(&self) -> Option<&Timing> {
        match &self.payload {
            PatternPayload::Timing(p) => Some(p),
            _ => None,
        }
    }

    pub fn emotional_tone(&self) -> Option<&EmotionalTone> {
        match &self.payload {
            PatternPayload::EmotionalTone(p) => Some(p),
            _ => None,
        }
    }
}
