// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Success patterns for the Tijara response engine.
//!
//! Patterns are learned from past conversations by [`LearningPipeline`],
//! approved by a human, then loaded per tenant by [`PatternEngine`] and used
//! to add prompt guidance and to optimize generated responses.

pub mod cache;
pub mod engine;
pub mod learning;
pub mod payload;
pub mod performance;
pub mod rewrite;

pub use cache::PatternCache;
pub use engine::{OptimizedResponse, PatternEngine, PatternUsage, ResponseContext};
pub use learning::{LearningPipeline, discover, is_successful};
pub use payload::{
    EmotionalTone, Pattern, PatternError, PatternPayload, PatternType, ResponseStyle, Timing,
    WordUsage,
};
pub use performance::{PerformanceTracker, trend};
pub use rewrite::Phrasing;
