// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end test harness.
//!
//! `TestHarness` starts a complete [`AgentRuntime`] over in-memory
//! collaborators and a scripted provider. `send()` drives one customer
//! turn through the full pipeline; `shutdown()` drains the background
//! worker so side effects can be asserted.

use std::sync::Arc;

use tijara_agent::{AgentResponse, AgentRuntime, Collaborators, TurnRequest};
use tijara_config::TijaraConfig;
use tijara_config::model::CredentialConfig;
use tijara_core::{
    CompletionProvider, ConversationId, CustomerId, PrioritySettings, RankedSnippet,
    StoredPattern, TenantId, TijaraError,
};

use crate::collaborators::{
    InMemoryMemory, InMemoryPatternRepository, InMemoryTenantConfig, RecordingOrderService,
    StaticRetriever,
};
use crate::mock_provider::{SCRIPTED_PROVIDER, ScriptStep, ScriptedProvider};

/// Tenant every harness turn is sent for.
pub const TEST_TENANT: &str = "shop-1";

const DEFAULT_BASE_PROMPT: &str = "أنت مساعد ودود لمتجر أحذية. ساعد العملاء في اختيار المنتج المناسب.";

/// Builds a shared-pool credential routed to the scripted provider.
pub fn scripted_credential(id: &str, model: &str, priority: i32) -> CredentialConfig {
    CredentialConfig {
        id: id.to_string(),
        tenant_id: None,
        provider: SCRIPTED_PROVIDER.to_string(),
        api_key: format!("test-key-{id}"),
        model: model.to_string(),
        priority,
        is_active: true,
        rpm: None,
        rph: None,
        rpd: None,
    }
}

/// Builder for test environments.
pub struct TestHarnessBuilder {
    config: TijaraConfig,
    base_prompt: Option<String>,
    priority: Option<PrioritySettings>,
    steps: Vec<ScriptStep>,
    snippets: Vec<(String, RankedSnippet)>,
    patterns: Vec<StoredPattern>,
    settings: Vec<(String, String)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TijaraConfig::default();
        config.credentials = vec![scripted_credential("cred-a", "gemini-2.0-flash", 1)];
        Self {
            config,
            base_prompt: Some(DEFAULT_BASE_PROMPT.to_string()),
            priority: None,
            steps: Vec::new(),
            snippets: Vec::new(),
            patterns: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TijaraConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credentials(mut self, credentials: Vec<CredentialConfig>) -> Self {
        self.config.credentials = credentials;
        self
    }

    pub fn with_base_prompt(mut self, prompt: &str) -> Self {
        self.base_prompt = Some(prompt.to_string());
        self
    }

    /// Leaves the tenant without a personality prompt.
    pub fn without_base_prompt(mut self) -> Self {
        self.base_prompt = None;
        self
    }

    pub fn with_priority_settings(mut self, settings: PrioritySettings) -> Self {
        self.priority = Some(settings);
        self
    }

    pub fn with_mock_responses(mut self, responses: Vec<&str>) -> Self {
        self.steps
            .extend(responses.into_iter().map(|r| ScriptStep::Reply(r.to_string())));
        self
    }

    pub fn with_steps(mut self, steps: Vec<ScriptStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Returns `snippet` for any message containing `trigger`.
    pub fn with_snippet(mut self, trigger: &str, snippet: RankedSnippet) -> Self {
        self.snippets.push((trigger.to_string(), snippet));
        self
    }

    pub fn with_pattern(mut self, pattern: StoredPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn with_setting(mut self, key: &str, value: &str) -> Self {
        self.settings.push((key.to_string(), value.to_string()));
        self
    }

    /// Seeds the stores and starts the runtime.
    pub async fn build(self) -> Result<TestHarness, TijaraError> {
        let tenant = TenantId::new(TEST_TENANT)?;
        let stores = Stores {
            memory: Arc::new(InMemoryMemory::new()),
            retriever: Arc::new(StaticRetriever::new()),
            tenant_config: Arc::new(InMemoryTenantConfig::new()),
            patterns: Arc::new(InMemoryPatternRepository::new()),
            orders: Arc::new(RecordingOrderService::new()),
            provider: Arc::new(ScriptedProvider::with_steps(self.steps)),
        };

        if let Some(prompt) = &self.base_prompt {
            stores.tenant_config.set_base_prompt(&tenant, prompt).await;
        }
        if let Some(priority) = self.priority {
            stores
                .tenant_config
                .set_priority_settings(&tenant, priority)
                .await;
        }
        for (key, value) in &self.settings {
            stores.tenant_config.set_setting(&tenant, key, value).await;
        }
        for (trigger, snippet) in self.snippets {
            stores.retriever.add(&tenant, &trigger, snippet).await;
        }
        for pattern in self.patterns {
            stores.patterns.insert(pattern).await;
        }

        let provider: Arc<dyn CompletionProvider> = stores.provider.clone();
        let runtime = AgentRuntime::start(
            &self.config,
            Collaborators {
                memory: stores.memory.clone(),
                retriever: stores.retriever.clone(),
                tenant_config: stores.tenant_config.clone(),
                patterns: stores.patterns.clone(),
                orders: stores.orders.clone(),
                providers: vec![provider],
            },
        )?;

        Ok(TestHarness {
            runtime,
            tenant,
            conversation_id: ConversationId::from("conv-1"),
            customer_id: CustomerId::from("customer-1"),
            stores,
        })
    }
}

/// Handles to every in-memory collaborator, kept for assertions.
#[derive(Clone)]
pub struct Stores {
    pub memory: Arc<InMemoryMemory>,
    pub retriever: Arc<StaticRetriever>,
    pub tenant_config: Arc<InMemoryTenantConfig>,
    pub patterns: Arc<InMemoryPatternRepository>,
    pub orders: Arc<RecordingOrderService>,
    pub provider: Arc<ScriptedProvider>,
}

/// A running engine over in-memory collaborators.
pub struct TestHarness {
    runtime: AgentRuntime,
    pub tenant: TenantId,
    pub conversation_id: ConversationId,
    pub customer_id: CustomerId,
    pub stores: Stores,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    /// A request from the harness customer in the harness conversation.
    pub fn request(&self, message: &str) -> TurnRequest {
        TurnRequest {
            tenant_id: Some(self.tenant.to_string()),
            conversation_id: self.conversation_id.clone(),
            customer_id: self.customer_id.clone(),
            message: message.to_string(),
        }
    }

    pub async fn send(&self, message: &str) -> Result<AgentResponse, TijaraError> {
        self.send_request(self.request(message)).await
    }

    pub async fn send_request(&self, request: TurnRequest) -> Result<AgentResponse, TijaraError> {
        self.runtime.orchestrator().handle_turn(request).await
    }

    /// Stops the runtime after running every queued background job.
    pub async fn shutdown(self) -> Stores {
        self.runtime.shutdown().await;
        self.stores
    }
}
