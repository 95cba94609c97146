// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn response pipeline.
//!
//! Every turn walks `BUILD_CONTEXT -> ENHANCE_PROMPT -> GENERATE -> OPTIMIZE
//! -> FINALIZE`. Order turns leave after `BUILD_CONTEXT` with a templated
//! reply and go straight to `FINALIZE`.
//!
//! Failures split two ways. Missing tenant configuration and missing tenant
//! ids are returned as errors for operators. Everything else (pool
//! exhaustion, provider and storage failures) becomes a silent response
//! with the full error logged, so no internal detail reaches a customer.
//! An order turn whose state marker cannot be stored is also returned as
//! an error, since the next turn would otherwise restart the order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use strum::Display;
use tijara_conflict::ConflictResolver;
use tijara_context::{ContextEngine, SectionKind, TurnInput};
use tijara_core::{
    ConflictType, ConversationId, CustomerId, Interaction, MemoryStore, PatternId, Priority,
    PrioritySettings, TenantConfigStore, TenantId, TijaraError,
};
use tijara_orders::{OrderDecision, OrderIntentMachine};
use tijara_patterns::{Pattern, PatternEngine, PatternUsage, ResponseContext};
use tijara_pool::ModelPool;
use tracing::{debug, error, info, warn};

use crate::background::{BackgroundJob, BackgroundQueue};
use crate::metrics::record_turn;
use crate::signals::{MessageSignals, classify};

/// Confidence reported when retrieval found nothing to ground the reply on.
const UNGROUNDED_CONFIDENCE: f32 = 0.5;

/// One inbound customer message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Raw tenant id from the outer layer; validated before any work.
    pub tenant_id: Option<String>,
    pub conversation_id: ConversationId,
    pub customer_id: CustomerId,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnStage {
    BuildContext,
    EnhancePrompt,
    Generate,
    Optimize,
    Finalize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnTelemetry {
    /// Stages entered, in order.
    pub stages: Vec<TurnStage>,
    /// Provider calls made by the pool.
    pub attempts: u32,
    /// Patterns left after conflict resolution.
    pub patterns_considered: Vec<PatternId>,
    /// Patterns that changed the response text.
    pub patterns_applied: Vec<PatternId>,
    pub conflicts: Vec<ConflictType>,
    pub latency: Duration,
    /// Error kind behind a silent response.
    pub silent_reason: Option<&'static str>,
}

/// What the outer layer sends back, if anything.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    /// `None` means stay silent on the channel.
    pub content: Option<String>,
    pub model_used: Option<String>,
    pub confidence: f32,
    pub intent: String,
    /// Set on order turns, including failed order-service calls.
    pub order: Option<OrderDecision>,
    pub telemetry: TurnTelemetry,
}

impl AgentResponse {
    pub fn is_silent(&self) -> bool {
        self.content.is_none()
    }
}

/// Result of a turn before telemetry is attached.
struct TurnReply {
    content: String,
    model_used: Option<String>,
    confidence: f32,
    intent: String,
    order: Option<OrderDecision>,
}

pub struct ResponseOrchestrator {
    memory: Arc<dyn MemoryStore>,
    tenant_config: Arc<dyn TenantConfigStore>,
    context: ContextEngine,
    pool: Arc<ModelPool>,
    patterns: Arc<PatternEngine>,
    conflicts: ConflictResolver,
    orders: OrderIntentMachine,
    background: BackgroundQueue,
    max_memory_messages: usize,
}

impl ResponseOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memory: Arc<dyn MemoryStore>,
        tenant_config: Arc<dyn TenantConfigStore>,
        context: ContextEngine,
        pool: Arc<ModelPool>,
        patterns: Arc<PatternEngine>,
        conflicts: ConflictResolver,
        orders: OrderIntentMachine,
        background: BackgroundQueue,
        max_memory_messages: usize,
    ) -> Self {
        Self {
            memory,
            tenant_config,
            context,
            pool,
            patterns,
            conflicts,
            orders,
            background,
            max_memory_messages,
        }
    }

    /// Handles one customer message.
    ///
    /// Returns `Err` for operator-visible failures: a missing tenant id, a
    /// missing base prompt, or an order state that could not be stored.
    /// Other failures produce a silent [`AgentResponse`].
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<AgentResponse, TijaraError> {
        let started = Instant::now();
        let tenant_id = match TenantId::from_optional(request.tenant_id.as_deref()) {
            Ok(id) => id,
            Err(e) => {
                record_turn("rejected", started.elapsed());
                error!(
                    conversation_id = %request.conversation_id,
                    error = %e,
                    "rejecting turn without tenant id"
                );
                return Err(e);
            }
        };

        let signals = classify(&request.message);
        let mut telemetry = TurnTelemetry::default();
        let outcome = self
            .run_turn(&tenant_id, &request, signals, started, &mut telemetry)
            .await;
        telemetry.latency = started.elapsed();

        match outcome {
            Ok(reply) => {
                record_turn(
                    if reply.order.is_some() { "order" } else { "replied" },
                    telemetry.latency,
                );
                info!(
                    tenant_id = %tenant_id,
                    conversation_id = %request.conversation_id,
                    intent = %reply.intent,
                    model = reply.model_used.as_deref().unwrap_or("-"),
                    attempts = telemetry.attempts,
                    patterns_applied = telemetry.patterns_applied.len(),
                    latency_ms = telemetry.latency.as_millis() as u64,
                    "turn completed"
                );
                Ok(AgentResponse {
                    content: Some(reply.content),
                    model_used: reply.model_used,
                    confidence: reply.confidence,
                    intent: reply.intent,
                    order: reply.order,
                    telemetry,
                })
            }
            Err(e) if e.is_operator_visible() => {
                record_turn("rejected", telemetry.latency);
                error!(
                    tenant_id = %tenant_id,
                    conversation_id = %request.conversation_id,
                    kind = e.kind(),
                    error = %e,
                    "turn rejected"
                );
                Err(e)
            }
            Err(e) => {
                record_turn("silent", telemetry.latency);
                error!(
                    tenant_id = %tenant_id,
                    conversation_id = %request.conversation_id,
                    stage = %telemetry.stages.last().map(ToString::to_string).unwrap_or_default(),
                    kind = e.kind(),
                    error = ?e,
                    "turn failed, replying silently"
                );
                telemetry.silent_reason = Some(e.kind());
                self.record_failed_usage(&tenant_id, &request.conversation_id, &telemetry);
                let intent: &'static str = signals.intent.into();
                Ok(AgentResponse {
                    content: None,
                    model_used: None,
                    confidence: 0.0,
                    intent: intent.to_string(),
                    order: None,
                    telemetry,
                })
            }
        }
    }

    async fn run_turn(
        &self,
        tenant_id: &TenantId,
        request: &TurnRequest,
        signals: MessageSignals,
        started: Instant,
        telemetry: &mut TurnTelemetry,
    ) -> Result<TurnReply, TijaraError> {
        let intent: &'static str = signals.intent.into();

        telemetry.stages.push(TurnStage::BuildContext);
        let base_prompt = self.base_prompt(tenant_id).await?;
        let history = self
            .memory
            .read(
                &request.conversation_id,
                &request.customer_id,
                self.max_memory_messages,
                tenant_id,
            )
            .await?;

        let decision = self
            .orders
            .evaluate(tenant_id, &history, &request.message)
            .await?;
        if !matches!(decision, OrderDecision::NotAnOrder) {
            telemetry.stages.push(TurnStage::Finalize);
            return self
                .finish_order_turn(tenant_id, request, signals, started, decision)
                .await;
        }

        let assembled = self
            .context
            .assemble(&TurnInput {
                tenant_id,
                customer_id: &request.customer_id,
                message: &request.message,
                intent,
                base_prompt: &base_prompt,
                history: &history,
            })
            .await?;

        telemetry.stages.push(TurnStage::EnhancePrompt);
        let patterns = self.approved_patterns(tenant_id).await;
        let settings = self.priority_settings(tenant_id).await;
        let reports = self.conflicts.detect(tenant_id, &base_prompt, &patterns);
        let resolution = self
            .conflicts
            .resolve(&base_prompt, &patterns, &reports, &settings);
        telemetry.conflicts = reports.iter().map(|r| r.conflict_type).collect();
        telemetry.patterns_considered = resolution.patterns.iter().map(|p| p.id.clone()).collect();
        if !resolution.reports.is_empty() {
            let involved: Vec<&PatternId> = resolution
                .reports
                .iter()
                .flat_map(|r| r.patterns_involved.iter())
                .collect();
            if self
                .patterns
                .first_conflict_report(tenant_id, &base_prompt, &involved)
            {
                self.background.submit(BackgroundJob::ConflictReports {
                    tenant_id: tenant_id.clone(),
                    reports: resolution.reports.clone(),
                });
            } else {
                debug!(tenant_id = %tenant_id, "conflicts already reported for this prompt");
            }
        }

        let mut prompt = assembled.prompt;
        prompt.replace(SectionKind::Personality, resolution.prompt.as_str());
        let prompt = self
            .patterns
            .apply_to_prompt(prompt, &resolution.patterns, intent);

        telemetry.stages.push(TurnStage::Generate);
        let generated = self.pool.invoke(&prompt.render(), tenant_id).await?;
        telemetry.attempts = generated.attempts;
        if generated.completion.text.trim().is_empty() {
            return Err(TijaraError::Provider {
                message: format!("model `{}` returned an empty completion", generated.model),
                source: None,
            });
        }

        telemetry.stages.push(TurnStage::Optimize);
        // A high-priority prompt only lets register-compatible patterns
        // touch the generated text.
        let candidates: Vec<Pattern> = if settings.prompt_priority == Priority::High {
            self.conflicts
                .compatible_patterns(&base_prompt, &resolution.patterns)
        } else {
            resolution.patterns.clone()
        };
        let optimized = self.patterns.apply_to_response(
            &generated.completion.text,
            &candidates,
            &ResponseContext {
                message_type: intent,
                customer_sentiment: signals.sentiment,
                phrasing: self.conflicts.phrasing(&base_prompt),
            },
        );
        telemetry.patterns_applied = optimized.applied.clone();

        telemetry.stages.push(TurnStage::Finalize);
        let confidence = assembled
            .retrieved
            .snippets
            .first()
            .map(|s| s.score)
            .unwrap_or(UNGROUNDED_CONFIDENCE);
        let interaction = Interaction {
            conversation_id: request.conversation_id.clone(),
            customer_id: request.customer_id.clone(),
            tenant_id: tenant_id.clone(),
            user_message: request.message.clone(),
            ai_response: optimized.text.clone(),
            intent: intent.to_string(),
            sentiment: signals.sentiment,
            confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
            model_used: Some(generated.model.clone()),
            mentioned_products: assembled.confident_products,
            created_at: Utc::now(),
        };
        self.remember(interaction.clone()).await;

        let successful = self.patterns.is_successful(&interaction);
        let usages: Vec<PatternUsage> = resolution
            .patterns
            .iter()
            .map(|p| PatternUsage {
                pattern_id: p.id.clone(),
                applied: optimized.applied.contains(&p.id),
            })
            .collect();
        if !usages.is_empty() {
            self.background.submit(BackgroundJob::RecordUsage {
                tenant_id: tenant_id.clone(),
                conversation_id: request.conversation_id.clone(),
                usages,
                successful,
            });
        }
        self.background.submit(BackgroundJob::Ingest(interaction));

        Ok(TurnReply {
            content: optimized.text,
            model_used: Some(generated.model),
            confidence,
            intent: intent.to_string(),
            order: None,
        })
    }

    /// Stores the order turn with its state marker and returns the template reply.
    ///
    /// The marker is the only record of where the order stands, so the write
    /// is retried once and a second failure fails the turn.
    async fn finish_order_turn(
        &self,
        tenant_id: &TenantId,
        request: &TurnRequest,
        signals: MessageSignals,
        started: Instant,
        decision: OrderDecision,
    ) -> Result<TurnReply, TijaraError> {
        let content = decision.reply().unwrap_or_default().to_string();
        let intent = decision.marker().unwrap_or("order").to_string();
        let confidence = decision.draft().map(|d| d.confidence).unwrap_or(1.0);

        let interaction = Interaction {
            conversation_id: request.conversation_id.clone(),
            customer_id: request.customer_id.clone(),
            tenant_id: tenant_id.clone(),
            user_message: request.message.clone(),
            ai_response: content.clone(),
            intent: intent.clone(),
            sentiment: signals.sentiment,
            confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
            model_used: None,
            mentioned_products: Vec::new(),
            created_at: Utc::now(),
        };
        if let Err(first) = self.memory.append(interaction.clone()).await {
            warn!(tenant_id = %tenant_id, error = %first, "order state write failed, retrying once");
            if let Err(e) = self.memory.append(interaction).await {
                return Err(TijaraError::OrderService {
                    message: format!(
                        "order state `{intent}` could not be saved for conversation {}",
                        request.conversation_id
                    ),
                    source: Some(Box::new(e)),
                });
            }
        }

        debug!(tenant_id = %tenant_id, decision = decision.kind(), "order turn handled");
        Ok(TurnReply {
            content,
            model_used: None,
            confidence,
            intent,
            order: Some(decision),
        })
    }

    async fn base_prompt(&self, tenant_id: &TenantId) -> Result<String, TijaraError> {
        self.tenant_config
            .get_base_prompt(tenant_id)
            .await?
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| TijaraError::MissingTenantConfig {
                tenant_id: tenant_id.to_string(),
            })
    }

    /// Patterns are an enhancement; a failed load means none this turn.
    async fn approved_patterns(&self, tenant_id: &TenantId) -> Arc<Vec<Pattern>> {
        match self.patterns.get_approved(tenant_id).await {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "pattern load failed, continuing without patterns");
                Arc::new(Vec::new())
            }
        }
    }

    async fn priority_settings(&self, tenant_id: &TenantId) -> PrioritySettings {
        match self.tenant_config.get_priority_settings(tenant_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "priority settings unreadable, using defaults");
                PrioritySettings::default()
            }
        }
    }

    /// Patterns resolved for a turn that then failed count as unsuccessful.
    fn record_failed_usage(
        &self,
        tenant_id: &TenantId,
        conversation_id: &ConversationId,
        telemetry: &TurnTelemetry,
    ) {
        if telemetry.patterns_considered.is_empty() {
            return;
        }
        let usages = telemetry
            .patterns_considered
            .iter()
            .map(|id| PatternUsage {
                pattern_id: id.clone(),
                applied: telemetry.patterns_applied.contains(id),
            })
            .collect();
        self.background.submit(BackgroundJob::RecordUsage {
            tenant_id: tenant_id.clone(),
            conversation_id: conversation_id.clone(),
            usages,
            successful: false,
        });
    }

    /// A memory write failure loses history but not the reply.
    async fn remember(&self, interaction: Interaction) {
        let tenant_id = interaction.tenant_id.clone();
        if let Err(e) = self.memory.append(interaction).await {
            error!(tenant_id = %tenant_id, error = %e, "failed to append interaction to memory");
        }
    }
}
