// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented generation lookup.

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::types::{CustomerId, RankedSnippet, TenantId};

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns snippets ranked by descending score.
    async fn search(
        &self,
        query: &str,
        intent: &str,
        customer_id: &CustomerId,
        tenant_id: &TenantId,
    ) -> Result<Vec<RankedSnippet>, TijaraError>;
}
