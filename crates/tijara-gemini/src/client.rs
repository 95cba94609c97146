// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! The API key and model come from the credential chosen by the model pool
//! on every call, so one client serves every (key, model) pair. Retries are
//! left to the pool: a 429 is returned as [`TijaraError::RateLimited`] with
//! the parsed quota metadata, anything else as [`TijaraError::Provider`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tijara_config::model::GeminiConfig;
use tijara_core::{Completion, CompletionProvider, ModelCredential, TijaraError, TokenUsage};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, Content, GenerateRequest, GenerateResponse, GenerationConfig, Part,
};

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    max_output_tokens: u32,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self, TijaraError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TijaraError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn request_for(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            }),
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        credential: &ModelCredential,
    ) -> Result<Completion, TijaraError> {
        let response = self
            .client
            .post(self.endpoint(&credential.model_name))
            .header("x-goog-api-key", credential.api_key.expose())
            .json(&self.request_for(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TijaraError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    TijaraError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, model = %credential.model_name, "gemini response received");

        if status.is_success() {
            let body: GenerateResponse =
                response.json().await.map_err(|e| TijaraError::Provider {
                    message: format!("failed to parse generateContent response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let text = body.text().ok_or_else(|| TijaraError::Provider {
                message: "generateContent returned no candidate text".to_string(),
                source: None,
            })?;
            let usage = body.usage_metadata.unwrap_or_default();
            return Ok(Completion {
                text,
                usage: TokenUsage {
                    input_tokens: usage.prompt_token_count,
                    output_tokens: usage.candidates_token_count,
                },
            });
        }

        let body = response.text().await.unwrap_or_default();
        let api_error = serde_json::from_str::<ApiErrorResponse>(&body).ok();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let violation = match &api_error {
                Some(parsed) => parsed.error.quota_violation(),
                None => tijara_core::QuotaViolation {
                    quota_id: "unknown".to_string(),
                    quota_value: None,
                    retry_after: None,
                },
            };
            warn!(
                model = %credential.model_name,
                quota_id = %violation.quota_id,
                "gemini quota exceeded"
            );
            return Err(TijaraError::RateLimited {
                model: credential.model_name.clone(),
                violation,
            });
        }

        let message = match api_error {
            Some(parsed) => format!(
                "Gemini API error ({} {}): {}",
                parsed.error.code, parsed.error.status, parsed.error.message
            ),
            None => format!("API returned {status}: {body}"),
        };
        Err(TijaraError::Provider {
            message,
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tijara_core::{ApiKey, WindowLimits};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(&GeminiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            max_output_tokens: 256,
        })
        .unwrap()
    }

    fn credential() -> ModelCredential {
        ModelCredential {
            id: "k1".into(),
            tenant_id: None,
            provider: "gemini".into(),
            api_key: ApiKey::new("test-key"),
            model_name: "gemini-2.0-flash".into(),
            priority: 1,
            is_active: true,
            limits: WindowLimits {
                rpm: 15,
                rph: 250,
                rpd: 1500,
            },
        }
    }

    #[tokio::test]
    async fn generate_success_maps_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "مرحباً"}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = provider(&server.uri())
            .generate("hello", &credential())
            .await
            .unwrap();
        assert_eq!(completion.text, "مرحباً");
        assert_eq!(completion.usage.input_tokens, 7);
        assert_eq!(completion.usage.output_tokens, 2);
    }

    #[tokio::test]
    async fn quota_error_becomes_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "code": 429,
                    "message": "quota",
                    "status": "RESOURCE_EXHAUSTED",
                    "details": [
                        {"@type": "type.googleapis.com/google.rpc.QuotaFailure",
                         "violations": [{"quotaId": "GenerateRequestsPerMinutePerProjectPerModel-FreeTier", "quotaValue": "15"}]},
                        {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "20s"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate("hello", &credential())
            .await
            .unwrap_err();
        match err {
            TijaraError::RateLimited { model, violation } => {
                assert_eq!(model, "gemini-2.0-flash");
                assert_eq!(violation.quota_value, Some(15));
                assert_eq!(violation.retry_after, Some(Duration::from_secs(20)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_provider_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate("hello", &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, TijaraError::Provider { .. }));
        assert!(err.to_string().contains("UNAVAILABLE"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate("hello", &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, TijaraError::Provider { .. }));
    }
}
