// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for LLM integrations (Gemini, scripted test providers).

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::types::{Completion, ModelCredential};

/// A generative completion backend.
///
/// Implementations must report quota violations as
/// [`TijaraError::RateLimited`] so the model pool can fail over, and every
/// other failure as [`TijaraError::Provider`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name matched against `ModelCredential::provider`.
    fn name(&self) -> &str;

    /// Generates a completion for `prompt` using the given credential's key and model.
    async fn generate(
        &self,
        prompt: &str,
        credential: &ModelCredential,
    ) -> Result<Completion, TijaraError>;
}
