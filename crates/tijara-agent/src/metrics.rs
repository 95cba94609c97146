// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder (Prometheus,
//! statsd, etc.) collects these metrics. Recording without a recorder is
//! a no-op.

use std::time::Duration;

use metrics::{describe_counter, describe_histogram};

/// Register all Tijara metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("tijara_turns_total", "Customer turns handled, by outcome");
    describe_histogram!(
        "tijara_turn_latency_seconds",
        "End-to-end turn latency in seconds"
    );
    describe_counter!(
        "tijara_model_invocations_total",
        "Provider calls made by the model pool, by outcome"
    );
    describe_counter!(
        "tijara_model_exhausted_total",
        "Credentials marked exhausted, by violated window"
    );
    describe_counter!(
        "tijara_sweeper_resets_total",
        "Usage windows reset by the periodic sweeper"
    );
    describe_counter!(
        "tijara_pattern_usage_records_total",
        "Pattern usage rows written"
    );
    describe_counter!(
        "tijara_conflicts_detected_total",
        "Prompt/pattern conflicts detected, by type"
    );
    describe_counter!("tijara_orders_total", "Order decisions, by outcome");
    describe_counter!(
        "tijara_background_jobs_total",
        "Background side-effect jobs, by kind and outcome"
    );
}

/// Record a finished turn.
pub fn record_turn(outcome: &'static str, latency: Duration) {
    metrics::counter!("tijara_turns_total", "outcome" => outcome).increment(1);
    metrics::histogram!("tijara_turn_latency_seconds").record(latency.as_secs_f64());
}

/// Record a background job result.
pub fn record_job(kind: &'static str, outcome: &'static str) {
    metrics::counter!("tijara_background_jobs_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}
