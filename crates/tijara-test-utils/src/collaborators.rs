// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementations of the collaborator traits.
//!
//! Every store partitions by tenant the way a real backend would, so
//! tests can check that nothing leaks across tenants.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use tijara_core::{
    ConflictReport, ConversationId, CustomerId, Interaction, MemoryStore, OrderDraft,
    OrderReceipt, OrderService, PatternId, PatternPerformance, PatternRepository,
    PatternUsageRecord, PrioritySettings, RankedSnippet, Retriever, StoredPattern,
    TenantConfigStore, TenantId, TijaraError,
};

fn storage_error(message: &str) -> TijaraError {
    TijaraError::Storage {
        source: message.to_string().into(),
    }
}

/// Builds an approved, active pattern row.
pub fn stored_pattern(
    id: &str,
    tenant_id: &TenantId,
    pattern_type: &str,
    payload: serde_json::Value,
    success_rate: f32,
) -> StoredPattern {
    StoredPattern {
        id: PatternId::from(id),
        tenant_id: tenant_id.clone(),
        pattern_type: pattern_type.to_string(),
        payload,
        success_rate,
        sample_size: 25,
        is_approved: true,
        is_active: true,
        discovered_at: Utc::now(),
    }
}

// --- Memory ---

#[derive(Default)]
pub struct InMemoryMemory {
    interactions: Mutex<Vec<Interaction>>,
    fail_reads: AtomicBool,
    failing_appends: AtomicUsize,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn interactions(&self) -> Vec<Interaction> {
        self.interactions.lock().await.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` appends fail.
    pub fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
    async fn read(
        &self,
        conversation_id: &ConversationId,
        customer_id: &CustomerId,
        limit: usize,
        tenant_id: &TenantId,
    ) -> Result<Vec<Interaction>, TijaraError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(storage_error("memory store unavailable"));
        }
        let all = self.interactions.lock().await;
        let matching: Vec<Interaction> = all
            .iter()
            .filter(|i| {
                i.tenant_id == *tenant_id
                    && i.conversation_id == *conversation_id
                    && i.customer_id == *customer_id
            })
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn append(&self, interaction: Interaction) -> Result<(), TijaraError> {
        let failing = self
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(storage_error("memory store rejected the write"));
        }
        self.interactions.lock().await.push(interaction);
        Ok(())
    }
}

// --- Retrieval ---

/// Returns the snippets whose trigger appears in the query.
#[derive(Default)]
pub struct StaticRetriever {
    entries: Mutex<Vec<(TenantId, String, RankedSnippet)>>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, tenant_id: &TenantId, trigger: &str, snippet: RankedSnippet) {
        self.entries
            .lock()
            .await
            .push((tenant_id.clone(), trigger.to_lowercase(), snippet));
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(
        &self,
        query: &str,
        _intent: &str,
        _customer_id: &CustomerId,
        tenant_id: &TenantId,
    ) -> Result<Vec<RankedSnippet>, TijaraError> {
        let query = query.to_lowercase();
        let mut hits: Vec<RankedSnippet> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|(tenant, trigger, _)| tenant == tenant_id && query.contains(trigger.as_str()))
            .map(|(_, _, snippet)| snippet.clone())
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}

// --- Tenant settings ---

#[derive(Default)]
pub struct InMemoryTenantConfig {
    prompts: Mutex<HashMap<TenantId, String>>,
    priorities: Mutex<HashMap<TenantId, PrioritySettings>>,
    settings: Mutex<HashMap<(TenantId, String), String>>,
}

impl InMemoryTenantConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_base_prompt(&self, tenant_id: &TenantId, prompt: &str) {
        self.prompts
            .lock()
            .await
            .insert(tenant_id.clone(), prompt.to_string());
    }

    pub async fn set_priority_settings(&self, tenant_id: &TenantId, settings: PrioritySettings) {
        self.priorities
            .lock()
            .await
            .insert(tenant_id.clone(), settings);
    }

    pub async fn set_setting(&self, tenant_id: &TenantId, key: &str, value: &str) {
        self.settings
            .lock()
            .await
            .insert((tenant_id.clone(), key.to_string()), value.to_string());
    }
}

#[async_trait]
impl TenantConfigStore for InMemoryTenantConfig {
    async fn get_base_prompt(&self, tenant_id: &TenantId) -> Result<Option<String>, TijaraError> {
        Ok(self.prompts.lock().await.get(tenant_id).cloned())
    }

    async fn get_priority_settings(
        &self,
        tenant_id: &TenantId,
    ) -> Result<PrioritySettings, TijaraError> {
        Ok(self
            .priorities
            .lock()
            .await
            .get(tenant_id)
            .copied()
            .unwrap_or_default())
    }

    async fn get_setting(
        &self,
        tenant_id: &TenantId,
        key: &str,
    ) -> Result<Option<String>, TijaraError> {
        Ok(self
            .settings
            .lock()
            .await
            .get(&(tenant_id.clone(), key.to_string()))
            .cloned())
    }
}

// --- Patterns ---

#[derive(Default)]
pub struct InMemoryPatternRepository {
    patterns: Mutex<Vec<StoredPattern>>,
    discovered: Mutex<Vec<StoredPattern>>,
    usage_batches: Mutex<Vec<Vec<PatternUsageRecord>>>,
    performance: Mutex<Vec<PatternPerformance>>,
    conflict_reports: Mutex<Vec<ConflictReport>>,
    list_calls: AtomicUsize,
}

impl InMemoryPatternRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pattern: StoredPattern) {
        self.patterns.lock().await.push(pattern);
    }

    /// Flips a pattern's active flag, as an operator would.
    pub async fn set_active(&self, id: &PatternId, active: bool) {
        if let Some(p) = self.patterns.lock().await.iter_mut().find(|p| p.id == *id) {
            p.is_active = active;
        }
    }

    pub async fn discovered(&self) -> Vec<StoredPattern> {
        self.discovered.lock().await.clone()
    }

    /// Usage rows grouped by the repository call that wrote them.
    pub async fn usage_batches(&self) -> Vec<Vec<PatternUsageRecord>> {
        self.usage_batches.lock().await.clone()
    }

    pub async fn performance(&self) -> Vec<PatternPerformance> {
        self.performance.lock().await.clone()
    }

    pub async fn conflict_reports(&self) -> Vec<ConflictReport> {
        self.conflict_reports.lock().await.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn list_approved(&self, tenant_id: &TenantId) -> Result<Vec<StoredPattern>, TijaraError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .patterns
            .lock()
            .await
            .iter()
            .filter(|p| p.tenant_id == *tenant_id && p.is_approved)
            .cloned()
            .collect())
    }

    async fn insert_discovered(
        &self,
        _tenant_id: &TenantId,
        patterns: Vec<StoredPattern>,
    ) -> Result<(), TijaraError> {
        self.discovered.lock().await.extend(patterns);
        Ok(())
    }

    async fn insert_usage_batch(
        &self,
        _tenant_id: &TenantId,
        records: Vec<PatternUsageRecord>,
    ) -> Result<(), TijaraError> {
        self.usage_batches.lock().await.push(records);
        Ok(())
    }

    async fn save_performance(
        &self,
        _tenant_id: &TenantId,
        performance: Vec<PatternPerformance>,
    ) -> Result<(), TijaraError> {
        let mut stored = self.performance.lock().await;
        for snapshot in performance {
            stored.retain(|p| p.pattern_id != snapshot.pattern_id || p.tenant_id != snapshot.tenant_id);
            stored.push(snapshot);
        }
        Ok(())
    }

    async fn save_conflict_reports(
        &self,
        _tenant_id: &TenantId,
        reports: Vec<ConflictReport>,
    ) -> Result<(), TijaraError> {
        self.conflict_reports.lock().await.extend(reports);
        Ok(())
    }
}

// --- Orders ---

/// Records created orders. Can be told to fail the next `n` calls.
#[derive(Default)]
pub struct RecordingOrderService {
    created: Mutex<Vec<(OrderDraft, TenantId)>>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl RecordingOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub async fn created(&self) -> Vec<(OrderDraft, TenantId)> {
        self.created.lock().await.clone()
    }

    /// Every `create` call, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderService for RecordingOrderService {
    async fn create(
        &self,
        draft: &OrderDraft,
        tenant_id: &TenantId,
    ) -> Result<OrderReceipt, TijaraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TijaraError::OrderService {
                message: "order backend unavailable".to_string(),
                source: None,
            });
        }
        let mut created = self.created.lock().await;
        created.push((draft.clone(), tenant_id.clone()));
        Ok(OrderReceipt {
            order_number: format!("ORD-{:04}", created.len()),
            total: draft.price.unwrap_or_default() * f64::from(draft.quantity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn interaction(tenant_id: &TenantId, n: usize) -> Interaction {
        Interaction {
            conversation_id: "c1".into(),
            customer_id: "u1".into(),
            tenant_id: tenant_id.clone(),
            user_message: format!("message {n}"),
            ai_response: "reply".into(),
            intent: "general".into(),
            sentiment: 0.0,
            confidence: 0.5,
            processing_time_ms: 1,
            model_used: None,
            mentioned_products: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_reads_are_tenant_scoped_and_bounded() {
        let memory = InMemoryMemory::new();
        let a = tenant("a");
        let b = tenant("b");
        for n in 0..5 {
            memory.append(interaction(&a, n)).await.unwrap();
        }
        memory.append(interaction(&b, 99)).await.unwrap();

        let read = memory.read(&"c1".into(), &"u1".into(), 3, &a).await.unwrap();
        let messages: Vec<&str> = read.iter().map(|i| i.user_message.as_str()).collect();
        assert_eq!(messages, ["message 2", "message 3", "message 4"]);
        assert_eq!(memory.read(&"c1".into(), &"u1".into(), 10, &b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn order_service_fails_then_recovers() {
        let orders = RecordingOrderService::new();
        orders.fail_next(1);
        let draft = OrderDraft {
            product_name: Some("Belle Boot".into()),
            price: Some(500.0),
            quantity: 2,
            ..OrderDraft::default()
        };
        let t = tenant("a");
        assert!(orders.create(&draft, &t).await.is_err());
        let receipt = orders.create(&draft, &t).await.unwrap();
        assert_eq!(receipt.order_number, "ORD-0001");
        assert!((receipt.total - 1000.0).abs() < f64::EPSILON);
        assert_eq!(orders.calls(), 2);
    }
}
