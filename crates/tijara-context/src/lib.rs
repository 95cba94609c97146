// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for the Tijara response engine.
//!
//! A turn's prompt is built from named sections rendered in a fixed order:
//! personality, response rules, memory, retrieved data, pattern guidance,
//! and the customer message. The same inputs always render the same text.

pub mod history;
pub mod prompt;
pub mod provider;
pub mod retrieval;

use std::sync::Arc;

use tijara_config::model::{OrchestratorConfig, OrdersConfig};
use tijara_core::{CustomerId, Interaction, ProductMention, Retriever, TenantId, TijaraError};
use tracing::{debug, warn};

pub use history::render_history;
pub use prompt::{Prompt, PromptSection, SectionKind};
pub use provider::ContextProvider;
pub use retrieval::{RetrievedContext, select_snippets};

/// Rules appended to every tenant personality.
pub const DEFAULT_RESPONSE_RULES: &str = "\
- Reply in the customer's language and dialect unless the personality says otherwise.
- Only quote prices, sizes, and stock that appear in the store data.
- Keep replies short and ask at most one question.
- Never mention internal systems, errors, or that you are an AI model.";

/// Everything the engine needs to assemble one turn's prompt.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub tenant_id: &'a TenantId,
    pub customer_id: &'a CustomerId,
    pub message: &'a str,
    pub intent: &'a str,
    pub base_prompt: &'a str,
    /// Conversation memory, oldest first.
    pub history: &'a [Interaction],
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub prompt: Prompt,
    pub retrieved: RetrievedContext,
    /// Products from confident retrieval matches, to be stored with the turn.
    pub confident_products: Vec<ProductMention>,
}

pub struct ContextEngine {
    retriever: Arc<dyn Retriever>,
    providers: Vec<Arc<dyn ContextProvider>>,
    response_rules: String,
    max_memory_messages: usize,
    retrieval_limit: usize,
    match_threshold: f32,
    confident_threshold: f32,
}

impl ContextEngine {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        orchestrator: &OrchestratorConfig,
        orders: &OrdersConfig,
    ) -> Self {
        Self {
            retriever,
            providers: Vec::new(),
            response_rules: DEFAULT_RESPONSE_RULES.to_string(),
            max_memory_messages: orchestrator.max_memory_messages,
            retrieval_limit: orchestrator.retrieval_limit,
            match_threshold: orders.rag_match_threshold,
            confident_threshold: orders.rag_confident_threshold,
        }
    }

    /// Registers an extra section provider.
    pub fn add_provider(&mut self, provider: Arc<dyn ContextProvider>) {
        self.providers.push(provider);
    }

    pub fn with_response_rules(mut self, rules: impl Into<String>) -> Self {
        self.response_rules = rules.into();
        self
    }

    /// Builds the base prompt for a turn before pattern guidance is added.
    ///
    /// Retrieval failures degrade to a prompt without store data.
    pub async fn assemble(&self, input: &TurnInput<'_>) -> Result<AssembledContext, TijaraError> {
        let mut prompt = Prompt::new()
            .with(SectionKind::Personality, input.base_prompt)
            .with(SectionKind::ResponseRules, self.response_rules.as_str())
            .with(
                SectionKind::Memory,
                render_history(input.history, self.max_memory_messages),
            );

        let retrieved = match self
            .retriever
            .search(input.message, input.intent, input.customer_id, input.tenant_id)
            .await
        {
            Ok(snippets) => select_snippets(
                snippets,
                self.match_threshold,
                self.confident_threshold,
                self.retrieval_limit,
            ),
            Err(e) => {
                warn!(
                    tenant_id = %input.tenant_id,
                    error = %e,
                    "retrieval failed, continuing without store data"
                );
                RetrievedContext::default()
            }
        };
        prompt.push(SectionKind::RetrievedData, retrieved.render());

        for provider in &self.providers {
            let sections = provider
                .provide_sections(input.tenant_id, input.customer_id, input.message)
                .await?;
            for section in sections {
                prompt.push(section.kind, section.body);
            }
        }

        prompt.push(SectionKind::Message, input.message);

        let confident_products = retrieved.confident_products(self.confident_threshold);
        debug!(
            tenant_id = %input.tenant_id,
            sections = prompt.len(),
            snippets = retrieved.snippets.len(),
            confident = retrieved.confident,
            "context assembled"
        );

        Ok(AssembledContext {
            prompt,
            retrieved,
            confident_products,
        })
    }
}
