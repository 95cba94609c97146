// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider for deterministic testing.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tijara_core::{
    Completion, CompletionProvider, ModelCredential, QuotaViolation, TijaraError, TokenUsage,
};

/// Name credentials must use to route to this provider.
pub const SCRIPTED_PROVIDER: &str = "scripted";

/// One scripted outcome, consumed in FIFO order.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(String),
    RateLimited { quota_id: String },
    Fail(String),
}

/// A recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub model: String,
    pub prompt: String,
}

/// A completion provider that plays back a script.
///
/// Models registered with [`ScriptedProvider::rate_limit_model`] always
/// answer with a 429 and do not consume the script. An empty script
/// replies "mock response".
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptStep>>,
    limited_models: Mutex<HashSet<String>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::with_steps(Vec::new())
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_steps(responses.into_iter().map(ScriptStep::Reply).collect())
    }

    pub fn with_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            script: Mutex::new(VecDeque::from(steps)),
            limited_models: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, step: ScriptStep) {
        self.script.lock().await.push_back(step);
    }

    pub async fn rate_limit_model(&self, model: &str) {
        self.limited_models.lock().await.insert(model.to_string());
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn rate_limited(model: &str, quota_id: &str) -> TijaraError {
    TijaraError::RateLimited {
        model: model.to_string(),
        violation: QuotaViolation {
            quota_id: quota_id.to_string(),
            quota_value: None,
            retry_after: Some(Duration::from_secs(30)),
        },
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        SCRIPTED_PROVIDER
    }

    async fn generate(
        &self,
        prompt: &str,
        credential: &ModelCredential,
    ) -> Result<Completion, TijaraError> {
        let model = credential.model_name.as_str();
        self.calls.lock().await.push(ProviderCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        if self.limited_models.lock().await.contains(model) {
            return Err(rate_limited(model, "GenerateRequestsPerMinutePerProjectPerModel"));
        }

        let step = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptStep::Reply("mock response".to_string()));
        match step {
            ScriptStep::Reply(text) => Ok(Completion {
                text,
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            ScriptStep::RateLimited { quota_id } => Err(rate_limited(model, &quota_id)),
            ScriptStep::Fail(message) => Err(TijaraError::Provider {
                message,
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tijara_core::{ApiKey, WindowLimits};

    fn credential(model: &str) -> ModelCredential {
        ModelCredential {
            id: model.into(),
            tenant_id: None,
            provider: SCRIPTED_PROVIDER.into(),
            api_key: ApiKey::new("test-key"),
            model_name: model.into(),
            priority: 1,
            is_active: true,
            limits: WindowLimits {
                rpm: 10,
                rph: 100,
                rpd: 1000,
            },
        }
    }

    #[tokio::test]
    async fn plays_script_then_default() {
        let provider = ScriptedProvider::with_steps(vec![
            ScriptStep::Reply("first".into()),
            ScriptStep::Fail("boom".into()),
        ]);
        let cred = credential("m1");
        assert_eq!(provider.generate("p", &cred).await.unwrap().text, "first");
        assert!(matches!(
            provider.generate("p", &cred).await,
            Err(TijaraError::Provider { .. })
        ));
        assert_eq!(provider.generate("p", &cred).await.unwrap().text, "mock response");
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn limited_model_does_not_consume_script() {
        let provider = ScriptedProvider::with_responses(vec!["kept".into()]);
        provider.rate_limit_model("m1").await;
        assert!(matches!(
            provider.generate("p", &credential("m1")).await,
            Err(TijaraError::RateLimited { .. })
        ));
        assert_eq!(
            provider.generate("p", &credential("m2")).await.unwrap().text,
            "kept"
        );
    }
}
