// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External order creation service.

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::types::{OrderDraft, OrderReceipt, TenantId};

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Creates an order from a complete draft.
    ///
    /// Failures should be reported as [`TijaraError::OrderService`].
    async fn create(
        &self,
        draft: &OrderDraft,
        tenant_id: &TenantId,
    ) -> Result<OrderReceipt, TijaraError>;
}
