// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant configuration lookup.

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::types::{PrioritySettings, TenantId};

#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    /// The tenant's personality prompt, `None` when not configured.
    async fn get_base_prompt(&self, tenant_id: &TenantId) -> Result<Option<String>, TijaraError>;

    async fn get_priority_settings(
        &self,
        tenant_id: &TenantId,
    ) -> Result<PrioritySettings, TijaraError>;

    /// Raw free-form setting value, e.g. `patterns_enabled`.
    async fn get_setting(
        &self,
        tenant_id: &TenantId,
        key: &str,
    ) -> Result<Option<String>, TijaraError>;
}
