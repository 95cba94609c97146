// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extension point for extra tenant-specific prompt sections.

use async_trait::async_trait;
use tijara_core::{CustomerId, TenantId, TijaraError};

use crate::prompt::PromptSection;

/// Supplies additional sections (store policies, opening hours, promotions)
/// for a turn. The engine calls every registered provider during assembly.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Returns an empty vec when nothing applies.
    async fn provide_sections(
        &self,
        tenant_id: &TenantId,
        customer_id: &CustomerId,
        message: &str,
    ) -> Result<Vec<PromptSection>, TijaraError>;
}
