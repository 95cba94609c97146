// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for success patterns, usage records, performance, and conflict reports.

use async_trait::async_trait;

use crate::error::TijaraError;
use crate::records::{ConflictReport, PatternPerformance, PatternUsageRecord, StoredPattern};
use crate::types::TenantId;

#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Lists approved and active patterns for a tenant.
    async fn list_approved(&self, tenant_id: &TenantId) -> Result<Vec<StoredPattern>, TijaraError>;

    /// Stores newly discovered patterns, pending human approval.
    async fn insert_discovered(
        &self,
        tenant_id: &TenantId,
        patterns: Vec<StoredPattern>,
    ) -> Result<(), TijaraError>;

    /// Writes a batch of usage records in a single operation.
    async fn insert_usage_batch(
        &self,
        tenant_id: &TenantId,
        records: Vec<PatternUsageRecord>,
    ) -> Result<(), TijaraError>;

    async fn save_performance(
        &self,
        tenant_id: &TenantId,
        performance: Vec<PatternPerformance>,
    ) -> Result<(), TijaraError>;

    async fn save_conflict_reports(
        &self,
        tenant_id: &TenantId,
        reports: Vec<ConflictReport>,
    ) -> Result<(), TijaraError>;
}
