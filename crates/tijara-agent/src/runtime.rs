// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the orchestrator, the background worker, and the sweeper.

use std::sync::Arc;

use tijara_config::TijaraConfig;
use tijara_conflict::ConflictResolver;
use tijara_context::ContextEngine;
use tijara_core::{
    CompletionProvider, MemoryStore, OrderService, PatternRepository, Retriever, TenantConfigStore,
    TijaraError,
};
use tijara_orders::OrderIntentMachine;
use tijara_patterns::{LearningPipeline, PatternEngine};
use tijara_pool::{ModelPool, spawn_sweeper};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::background::BackgroundWorker;
use crate::orchestrator::ResponseOrchestrator;

/// The external systems the engine talks to.
pub struct Collaborators {
    pub memory: Arc<dyn MemoryStore>,
    pub retriever: Arc<dyn Retriever>,
    pub tenant_config: Arc<dyn TenantConfigStore>,
    pub patterns: Arc<dyn PatternRepository>,
    pub orders: Arc<dyn OrderService>,
    /// Completion providers, matched to credentials by name.
    pub providers: Vec<Arc<dyn CompletionProvider>>,
}

/// A running engine: the orchestrator plus its background tasks.
pub struct AgentRuntime {
    orchestrator: Arc<ResponseOrchestrator>,
    pool: Arc<ModelPool>,
    patterns: Arc<PatternEngine>,
    learning: Arc<LearningPipeline>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl AgentRuntime {
    /// Builds every component and spawns the background worker and the
    /// window sweeper. Must be called from within a Tokio runtime.
    pub fn start(config: &TijaraConfig, collaborators: Collaborators) -> Result<Self, TijaraError> {
        let Collaborators {
            memory,
            retriever,
            tenant_config,
            patterns: repository,
            orders,
            providers,
        } = collaborators;

        let pool = Arc::new(ModelPool::from_config(
            &config.pool,
            &config.credentials,
            providers,
        )?);
        let patterns = Arc::new(PatternEngine::new(
            Arc::clone(&repository),
            Arc::clone(&tenant_config),
            config.patterns.clone(),
        ));
        let learning = Arc::new(LearningPipeline::new(
            Arc::clone(&repository),
            config.patterns.clone(),
        ));

        let cancel = CancellationToken::new();
        let (queue, worker) = BackgroundWorker::new(
            Arc::clone(&patterns),
            Arc::clone(&learning),
            repository,
        )
        .spawn(config.orchestrator.background_queue_capacity, cancel.child_token());
        let sweeper = spawn_sweeper(
            Arc::clone(&pool),
            config.pool.sweep_interval(),
            cancel.child_token(),
        );

        let orchestrator = Arc::new(ResponseOrchestrator::new(
            memory,
            tenant_config,
            ContextEngine::new(retriever, &config.orchestrator, &config.orders),
            Arc::clone(&pool),
            Arc::clone(&patterns),
            ConflictResolver::new(),
            OrderIntentMachine::new(orders, &config.orders),
            queue,
            config.orchestrator.max_memory_messages,
        ));

        info!(
            agent_name = %config.agent.name,
            credentials = config.credentials.len(),
            "tijara engine started"
        );

        Ok(Self {
            orchestrator,
            pool,
            patterns,
            learning,
            cancel,
            worker,
            sweeper,
        })
    }

    pub fn orchestrator(&self) -> &Arc<ResponseOrchestrator> {
        &self.orchestrator
    }

    /// The model pool, for credential administration and status.
    pub fn pool(&self) -> &Arc<ModelPool> {
        &self.pool
    }

    /// The pattern engine, for cache invalidation after approvals.
    pub fn patterns(&self) -> &Arc<PatternEngine> {
        &self.patterns
    }

    pub fn learning(&self) -> &Arc<LearningPipeline> {
        &self.learning
    }

    /// Runs until `signal` fires, then shuts down.
    pub async fn run_until(self, signal: CancellationToken) {
        signal.cancelled().await;
        self.shutdown().await;
    }

    /// Stops the sweeper, runs queued background jobs, and waits for both.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.worker.await {
            warn!(error = %e, "background worker ended abnormally");
        }
        if let Err(e) = self.sweeper.await {
            warn!(error = %e, "sweeper ended abnormally");
        }
        info!("tijara engine stopped");
    }
}
