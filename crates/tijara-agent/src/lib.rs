// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response orchestration for the Tijara engine.
//!
//! [`AgentRuntime`] wires the collaborators into a [`ResponseOrchestrator`]
//! and owns the background tasks:
//! - a worker that records pattern usage, feeds the learning pipeline, and
//!   stores conflict reports off the request path
//! - the rate-limit window sweeper

pub mod background;
pub mod metrics;
pub mod orchestrator;
pub mod runtime;
pub mod shutdown;
pub mod signals;
pub mod telemetry;

pub use background::{BackgroundJob, BackgroundQueue, BackgroundWorker};
pub use crate::metrics::register_metrics;
pub use orchestrator::{AgentResponse, ResponseOrchestrator, TurnRequest, TurnStage, TurnTelemetry};
pub use runtime::{AgentRuntime, Collaborators};
pub use shutdown::install_signal_handler;
pub use signals::{Intent, MessageSignals, classify};
pub use telemetry::init_tracing;
