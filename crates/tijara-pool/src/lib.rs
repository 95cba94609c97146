// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pool for the Tijara response engine.
//!
//! Tracks per-model request windows, remembers models exhausted by provider
//! quota violations, and selects the next usable (key, model) pair for a
//! tenant with bounded failover.

pub mod exhausted;
pub mod pool;
pub mod quota;
pub mod sweeper;
pub mod window;

pub use exhausted::{ExhaustedEntry, ExhaustedModels};
pub use pool::{CredentialStatus, ModelPool, PoolCompletion, SweepReport};
pub use quota::{ExhaustionPolicy, window_for_quota};
pub use sweeper::spawn_sweeper;
pub use window::{CredentialWindows, UsageWindow, WindowKind};
