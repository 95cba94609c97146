// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generative Language API `generateContent` request/response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tijara_core::QuotaViolation;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

/// Google RPC error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    /// Heterogeneous `google.rpc` detail messages, discriminated by `@type`.
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl ApiError {
    /// Extracts the first quota violation and the retry delay, if present.
    pub fn quota_violation(&self) -> QuotaViolation {
        let mut violation = QuotaViolation {
            quota_id: String::new(),
            quota_value: None,
            retry_after: None,
        };

        for detail in &self.details {
            if let Some(violations) = detail.get("violations").and_then(|v| v.as_array()) {
                if violation.quota_id.is_empty() {
                    if let Some(first) = violations.first() {
                        violation.quota_id = first
                            .get("quotaId")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string();
                        violation.quota_value = first.get("quotaValue").and_then(parse_u64);
                    }
                }
            }
            if let Some(delay) = detail.get("retryDelay").and_then(|v| v.as_str()) {
                violation.retry_after = parse_duration(delay);
            }
        }

        if violation.quota_id.is_empty() {
            violation.quota_id = if self.status.is_empty() {
                "unknown".to_string()
            } else {
                self.status.clone()
            };
        }
        violation
    }
}

/// `quotaValue` arrives as a JSON string holding an integer.
fn parse_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    }
}

/// Parses protobuf duration strings such as `"33s"` or `"1.5s"`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quota_failure_and_retry_info() {
        let body = serde_json::json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {
                        "@type": "type.googleapis.com/google.rpc.QuotaFailure",
                        "violations": [{
                            "quotaMetric": "generativelanguage.googleapis.com/generate_content_free_tier_requests",
                            "quotaId": "GenerateRequestsPerDayPerProjectPerModel-FreeTier",
                            "quotaValue": "200"
                        }]
                    },
                    {
                        "@type": "type.googleapis.com/google.rpc.RetryInfo",
                        "retryDelay": "33s"
                    }
                ]
            }
        });
        let parsed: ApiErrorResponse = serde_json::from_value(body).unwrap();
        let v = parsed.error.quota_violation();
        assert_eq!(v.quota_id, "GenerateRequestsPerDayPerProjectPerModel-FreeTier");
        assert_eq!(v.quota_value, Some(200));
        assert_eq!(v.retry_after, Some(Duration::from_secs(33)));
    }

    #[test]
    fn missing_details_fall_back_to_status() {
        let body = serde_json::json!({
            "error": {"code": 429, "message": "slow down", "status": "RESOURCE_EXHAUSTED"}
        });
        let parsed: ApiErrorResponse = serde_json::from_value(body).unwrap();
        let v = parsed.error.quota_violation();
        assert_eq!(v.quota_id, "RESOURCE_EXHAUSTED");
        assert_eq!(v.quota_value, None);
        assert_eq!(v.retry_after, None);
    }

    #[test]
    fn duration_strings() {
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("10"), None);
    }

    #[test]
    fn response_text_joins_parts() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "أهلاً "}, {"text": "بيك"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
        });
        let parsed: GenerateResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("أهلاً بيك"));
        assert_eq!(parsed.usage_metadata.unwrap().prompt_token_count, 12);
    }
}
