// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget side effects of a turn.
//!
//! Turns submit jobs to a bounded queue without waiting; a single worker
//! task runs them. Job failures are logged and counted, never returned to
//! the turn. A full queue drops the job instead of blocking the customer.

use std::sync::Arc;

use strum::IntoStaticStr;
use tijara_core::{ConflictReport, ConversationId, Interaction, PatternRepository, TenantId};
use tijara_patterns::{LearningPipeline, PatternEngine, PatternUsage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::record_job;

#[derive(Debug, Clone, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BackgroundJob {
    RecordUsage {
        tenant_id: TenantId,
        conversation_id: ConversationId,
        usages: Vec<PatternUsage>,
        successful: bool,
    },
    Ingest(Interaction),
    ConflictReports {
        tenant_id: TenantId,
        reports: Vec<ConflictReport>,
    },
}

impl BackgroundJob {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Submission side of the background queue.
#[derive(Clone)]
pub struct BackgroundQueue {
    tx: mpsc::Sender<BackgroundJob>,
}

impl BackgroundQueue {
    /// Enqueues without waiting. Returns `false` when the job was dropped.
    pub fn submit(&self, job: BackgroundJob) -> bool {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job = kind, "background queue full, dropping job");
                record_job(kind, "dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(job = kind, "background worker stopped, dropping job");
                record_job(kind, "dropped");
                false
            }
        }
    }
}

/// Runs background jobs against the pattern subsystem.
pub struct BackgroundWorker {
    patterns: Arc<PatternEngine>,
    learning: Arc<LearningPipeline>,
    repository: Arc<dyn PatternRepository>,
}

impl BackgroundWorker {
    pub fn new(
        patterns: Arc<PatternEngine>,
        learning: Arc<LearningPipeline>,
        repository: Arc<dyn PatternRepository>,
    ) -> Self {
        Self {
            patterns,
            learning,
            repository,
        }
    }

    /// Spawns the worker and returns its queue.
    ///
    /// On cancellation the worker stops accepting jobs, runs the ones
    /// already queued, and exits.
    pub fn spawn(self, capacity: usize, cancel: CancellationToken) -> (BackgroundQueue, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(async move {
            info!(capacity, "background worker started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        rx.close();
                        let mut drained = 0usize;
                        while let Some(job) = rx.recv().await {
                            self.run(job).await;
                            drained += 1;
                        }
                        info!(drained, "background worker stopped");
                        break;
                    }
                    job = rx.recv() => match job {
                        Some(job) => self.run(job).await,
                        None => {
                            info!("background queue closed, worker exiting");
                            break;
                        }
                    },
                }
            }
        });
        (BackgroundQueue { tx }, handle)
    }

    async fn run(&self, job: BackgroundJob) {
        let kind = job.kind();
        let result = match job {
            BackgroundJob::RecordUsage {
                tenant_id,
                conversation_id,
                usages,
                successful,
            } => self
                .patterns
                .record_usage_batch(&usages, &conversation_id, &tenant_id, successful)
                .await
                .map(|snapshots| debug!(tenant_id = %tenant_id, patterns = snapshots.len(), "pattern usage recorded")),
            BackgroundJob::Ingest(interaction) => self.learning.ingest(interaction).await.map(|stored| {
                if stored > 0 {
                    info!(patterns = stored, "learning batch produced new patterns");
                }
            }),
            BackgroundJob::ConflictReports { tenant_id, reports } => {
                self.repository.save_conflict_reports(&tenant_id, reports).await
            }
        };
        match result {
            Ok(()) => record_job(kind, "ok"),
            Err(e) => {
                warn!(job = kind, error = %e, "background job failed");
                record_job(kind, "error");
            }
        }
    }
}
