// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling per-pattern performance aggregates.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tijara_core::{PatternId, PatternPerformance, TenantId, Trend};

/// In-process aggregates, keyed by tenant and pattern id.
#[derive(Debug)]
pub struct PerformanceTracker {
    aggregates: DashMap<(TenantId, PatternId), PatternPerformance>,
    /// Trend threshold in percentage points.
    trend_threshold_points: f32,
}

impl PerformanceTracker {
    pub fn new(trend_threshold_points: f32) -> Self {
        Self {
            aggregates: DashMap::new(),
            trend_threshold_points,
        }
    }

    /// Folds one use into the pattern's aggregate and returns a snapshot.
    ///
    /// `baseline_rate` is the discovery success rate and only matters for
    /// the first use of a pattern.
    pub fn record(
        &self,
        tenant_id: &TenantId,
        pattern_id: &PatternId,
        baseline_rate: f32,
        successful: bool,
        now: DateTime<Utc>,
    ) -> PatternPerformance {
        let mut entry = self
            .aggregates
            .entry((tenant_id.clone(), pattern_id.clone()))
            .or_insert_with(|| PatternPerformance {
                pattern_id: pattern_id.clone(),
                tenant_id: tenant_id.clone(),
                usage_count: 0,
                success_count: 0,
                success_rate: baseline_rate,
                previous_rate: baseline_rate,
                trend: Trend::Stable,
                impact_score: 0.0,
                roi: 0.0,
                last_used_at: None,
            });
        let perf = entry.value_mut();
        let baseline = perf.success_rate - perf.impact_score;

        perf.previous_rate = perf.success_rate;
        perf.usage_count += 1;
        if successful {
            perf.success_count += 1;
        }
        perf.success_rate = perf.success_count as f32 / perf.usage_count as f32;
        perf.trend = trend(perf.previous_rate, perf.success_rate, self.trend_threshold_points);
        perf.impact_score = perf.success_rate - baseline;
        perf.roi = perf.impact_score * perf.usage_count as f32;
        perf.last_used_at = Some(now);
        perf.clone()
    }

    pub fn get(&self, tenant_id: &TenantId, pattern_id: &PatternId) -> Option<PatternPerformance> {
        self.aggregates
            .get(&(tenant_id.clone(), pattern_id.clone()))
            .map(|p| p.clone())
    }
}

/// Compares two rates in `[0, 1]` against a threshold in percentage points.
pub fn trend(previous: f32, current: f32, threshold_points: f32) -> Trend {
    let delta_points = (current - previous) * 100.0;
    if delta_points > threshold_points {
        Trend::Up
    } else if delta_points < -threshold_points {
        Trend::Down
    } else {
        Trend::Stable
    }
}
