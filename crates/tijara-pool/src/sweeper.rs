// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic window reset, independent of request traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pool::ModelPool;

/// Spawns the sweeper on the current runtime.
///
/// Ticks every `period` until `cancel` fires, so exhausted models recover
/// even when no turns arrive.
pub fn spawn_sweeper(
    pool: Arc<ModelPool>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "rate-limit sweeper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("rate-limit sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = pool.sweep(Utc::now());
                    if report.windows_reset > 0 || report.exhausted_purged > 0 {
                        metrics::counter!("tijara_sweeper_resets_total")
                            .increment(report.windows_reset as u64);
                        debug!(
                            windows_reset = report.windows_reset,
                            exhausted_purged = report.exhausted_purged,
                            "sweep completed"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tijara_config::model::PoolConfig;

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancellation() {
        let pool = Arc::new(ModelPool::new(&PoolConfig::default(), vec![], vec![]));
        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(pool, Duration::from_secs(60), cancel.clone());

        tokio::time::advance(Duration::from_secs(180)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
