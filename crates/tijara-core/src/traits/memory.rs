// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory store.

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::types::{ConversationId, CustomerId, Interaction, TenantId};

/// Bounded, tenant-isolated log of prior interactions.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Returns at most `limit` most recent interactions, oldest first.
    async fn read(
        &self,
        conversation_id: &ConversationId,
        customer_id: &CustomerId,
        limit: usize,
        tenant_id: &TenantId,
    ) -> Result<Vec<Interaction>, TijaraError>;

    /// Appends one interaction. The tenant is carried on the interaction.
    async fn append(&self, interaction: Interaction) -> Result<(), TijaraError>;
}
