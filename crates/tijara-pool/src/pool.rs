// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant-scoped model selection with quota-aware failover.
//!
//! Credentials live in an [`ArcSwap`] registry: turns read a snapshot
//! without locking, and admin actions replace it copy-on-write. Usage
//! windows and exhaustion marks are keyed per credential in `DashMap`s so
//! concurrent turns and the sweeper only ever contend on a single entry.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tijara_config::model::{CredentialConfig, PoolConfig};
use tijara_core::{
    Completion, CompletionProvider, CredentialId, ModelCredential, QuotaViolation, TenantId,
    TijaraError,
};
use tracing::{debug, info, warn};

use crate::exhausted::{ExhaustedEntry, ExhaustedModels};
use crate::quota::ExhaustionPolicy;
use crate::window::{CredentialWindows, UsageWindow, WindowKind};

/// A completion together with the credential that produced it.
#[derive(Debug, Clone)]
pub struct PoolCompletion {
    pub completion: Completion,
    pub credential_id: CredentialId,
    pub model: String,
    /// Provider calls made, including the successful one.
    pub attempts: u32,
}

/// Snapshot of one credential for operator dashboards.
#[derive(Debug, Clone)]
pub struct CredentialStatus {
    pub id: CredentialId,
    pub model: String,
    pub shared: bool,
    pub priority: i32,
    pub is_active: bool,
    pub windows: Vec<UsageWindow>,
    pub exhausted_until: Option<DateTime<Utc>>,
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub windows_reset: usize,
    pub exhausted_purged: usize,
}

pub struct ModelPool {
    credentials: ArcSwap<Vec<Arc<ModelCredential>>>,
    windows: DashMap<CredentialId, CredentialWindows>,
    exhausted: ExhaustedModels,
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    policy: ExhaustionPolicy,
    max_attempts: u32,
}

impl ModelPool {
    pub fn new(
        config: &PoolConfig,
        credentials: Vec<ModelCredential>,
        providers: Vec<Arc<dyn CompletionProvider>>,
    ) -> Self {
        let pool = Self {
            credentials: ArcSwap::from_pointee(Vec::new()),
            windows: DashMap::new(),
            exhausted: ExhaustedModels::new(),
            providers: providers
                .into_iter()
                .map(|p| (p.name().to_string(), p))
                .collect(),
            policy: ExhaustionPolicy::from_config(config),
            max_attempts: config.max_attempts.max(1),
        };
        pool.replace_credentials(credentials);
        pool
    }

    /// Builds a pool from `[[credentials]]` entries.
    pub fn from_config(
        config: &PoolConfig,
        credentials: &[CredentialConfig],
        providers: Vec<Arc<dyn CompletionProvider>>,
    ) -> Result<Self, TijaraError> {
        let creds = credentials
            .iter()
            .map(|c| c.to_credential(config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(config, creds, providers))
    }

    /// Replaces the credential registry.
    ///
    /// Windows of surviving credentials keep their counters; removed
    /// credentials lose their windows and exhaustion marks.
    pub fn replace_credentials(&self, credentials: Vec<ModelCredential>) {
        for cred in &credentials {
            self.windows
                .entry(cred.id.clone())
                .or_insert_with(|| CredentialWindows::new(cred.limits));
        }
        let ids: Vec<CredentialId> = credentials.iter().map(|c| c.id.clone()).collect();
        for id in self.known_ids() {
            if !ids.contains(&id) {
                self.exhausted.clear(&id);
            }
        }
        self.windows.retain(|id, _| ids.contains(id));
        let count = credentials.len();
        self.credentials
            .store(Arc::new(credentials.into_iter().map(Arc::new).collect()));
        info!(credentials = count, "model pool registry replaced");
    }

    /// Deactivates a credential, e.g. after the provider revoked its key.
    ///
    /// Returns `false` when no credential has that id.
    pub fn deactivate(&self, id: &CredentialId) -> bool {
        let mut found = false;
        self.credentials.rcu(|current| {
            found = false;
            let next: Vec<Arc<ModelCredential>> = current
                .iter()
                .map(|c| {
                    if &c.id == id {
                        found = true;
                        let mut updated = ModelCredential::clone(c);
                        updated.is_active = false;
                        Arc::new(updated)
                    } else {
                        Arc::clone(c)
                    }
                })
                .collect();
            next
        });
        if found {
            warn!(credential_id = %id, "credential deactivated");
        }
        found
    }

    /// Restores persisted counters for one window of a credential.
    pub fn restore_window(&self, id: &CredentialId, window: UsageWindow) {
        if let Some(mut entry) = self.windows.get_mut(id) {
            entry.set(window);
        }
    }

    /// Next usable credential for the tenant at `now`.
    pub fn select_model(
        &self,
        tenant_id: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<Arc<ModelCredential>, TijaraError> {
        self.select_excluding(tenant_id, now, &[])
            .ok_or_else(|| TijaraError::PoolExhausted {
                tenant_id: tenant_id.to_string(),
            })
    }

    /// Tenant credentials first, then the shared pool. Within a tier lower
    /// priority wins, ties going to the larger remaining daily budget.
    fn select_excluding(
        &self,
        tenant_id: &TenantId,
        now: DateTime<Utc>,
        excluded: &[CredentialId],
    ) -> Option<Arc<ModelCredential>> {
        let registry = self.credentials.load();
        let mut candidates: Vec<(u8, i32, Reverse<u32>, &Arc<ModelCredential>)> = registry
            .iter()
            .filter(|c| c.is_active && !excluded.contains(&c.id))
            .filter_map(|c| {
                let tier = match &c.tenant_id {
                    Some(owner) if owner == tenant_id => 0,
                    Some(_) => return None,
                    None => 1,
                };
                Some((tier, c.priority, Reverse(self.remaining_daily(c)), c))
            })
            .collect();
        candidates.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        candidates
            .into_iter()
            .map(|(_, _, _, c)| c)
            .find(|c| self.is_usable(c, now))
            .cloned()
    }

    fn is_usable(&self, credential: &ModelCredential, now: DateTime<Utc>) -> bool {
        if self.exhausted.is_exhausted(&credential.id, now) {
            debug!(credential_id = %credential.id, "skipping exhausted model");
            return false;
        }
        self.windows
            .get(&credential.id)
            .map(|w| w.all_available())
            .unwrap_or(true)
    }

    fn remaining_daily(&self, credential: &ModelCredential) -> u32 {
        self.windows
            .get(&credential.id)
            .map(|w| w.get(WindowKind::Rpd).remaining())
            .unwrap_or(credential.limits.rpd)
    }

    /// Calls the provider with the best credential, failing over on errors.
    ///
    /// A 429 marks only that credential exhausted before the next attempt.
    /// Other provider errors leave exhaustion state alone; the retry prefers
    /// another model and falls back to the same one when none is left.
    pub async fn invoke(
        &self,
        prompt: &str,
        tenant_id: &TenantId,
    ) -> Result<PoolCompletion, TijaraError> {
        let mut tried: Vec<CredentialId> = Vec::new();
        let mut last_error: Option<TijaraError> = None;

        for attempt in 1..=self.max_attempts {
            let now = Utc::now();
            let mut selected = self.select_excluding(tenant_id, now, &tried);
            if selected.is_none()
                && matches!(
                    last_error,
                    Some(TijaraError::Provider { .. } | TijaraError::Timeout { .. })
                )
            {
                selected = self.select_excluding(tenant_id, now, &[]);
            }
            let Some(credential) = selected else {
                break;
            };
            tried.push(credential.id.clone());

            let Some(provider) = self.providers.get(&credential.provider) else {
                warn!(
                    credential_id = %credential.id,
                    provider = %credential.provider,
                    "no provider registered for credential"
                );
                last_error = Some(TijaraError::Internal(format!(
                    "no provider registered for `{}`",
                    credential.provider
                )));
                continue;
            };

            debug!(
                tenant_id = %tenant_id,
                credential_id = %credential.id,
                model = %credential.model_name,
                attempt,
                "invoking model"
            );

            match provider.generate(prompt, &credential).await {
                Ok(completion) => {
                    self.record_use(&credential.id, Utc::now());
                    metrics::counter!(
                        "tijara_model_invocations_total",
                        "outcome" => "success"
                    )
                    .increment(1);
                    return Ok(PoolCompletion {
                        completion,
                        credential_id: credential.id.clone(),
                        model: credential.model_name.clone(),
                        attempts: attempt,
                    });
                }
                Err(TijaraError::RateLimited { model, violation }) => {
                    metrics::counter!(
                        "tijara_model_invocations_total",
                        "outcome" => "rate_limited"
                    )
                    .increment(1);
                    self.mark_exhausted(&credential, &violation, Utc::now());
                    last_error = Some(TijaraError::RateLimited { model, violation });
                }
                Err(err) => {
                    metrics::counter!(
                        "tijara_model_invocations_total",
                        "outcome" => "error"
                    )
                    .increment(1);
                    warn!(
                        tenant_id = %tenant_id,
                        credential_id = %credential.id,
                        attempt,
                        error = %err,
                        "model invocation failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err @ TijaraError::Provider { .. }) | Some(err @ TijaraError::Timeout { .. }) => {
                Err(err)
            }
            _ => Err(TijaraError::PoolExhausted {
                tenant_id: tenant_id.to_string(),
            }),
        }
    }

    /// Marks one credential exhausted after a quota violation.
    pub fn mark_exhausted(
        &self,
        credential: &ModelCredential,
        violation: &QuotaViolation,
        now: DateTime<Utc>,
    ) {
        let day_reset = self
            .windows
            .get(&credential.id)
            .and_then(|w| w.get(WindowKind::Rpd).resets_at());
        let (kind, until) = self.policy.exhausted_until(violation, now, day_reset);

        if let Some(quota) = violation.quota_value {
            if let Some(mut windows) = self.windows.get_mut(&credential.id) {
                windows.lower_limit(kind, u32::try_from(quota).unwrap_or(u32::MAX));
            }
        }

        self.exhausted.mark(
            &credential.id,
            ExhaustedEntry {
                until,
                kind,
                source_quota_value: violation.quota_value,
            },
        );
        metrics::counter!("tijara_model_exhausted_total", "window" => kind.to_string())
            .increment(1);
        warn!(
            credential_id = %credential.id,
            model = %credential.model_name,
            window = %kind,
            quota_id = %violation.quota_id,
            until = %until,
            "model marked exhausted"
        );
    }

    pub fn is_exhausted(&self, id: &CredentialId, now: DateTime<Utc>) -> bool {
        self.exhausted.is_exhausted(id, now)
    }

    fn record_use(&self, id: &CredentialId, now: DateTime<Utc>) {
        if let Some(mut windows) = self.windows.get_mut(id) {
            windows.record_use(now);
        }
    }

    /// Resets expired windows and purges expired exhaustion marks.
    ///
    /// Keys are collected first and each entry is then locked on its own, so
    /// in-flight turns are never blocked for the whole pass.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        for id in self.known_ids() {
            if let Some(mut windows) = self.windows.get_mut(&id) {
                report.windows_reset += windows.sweep(now);
            }
        }
        report.exhausted_purged = self.exhausted.purge_expired(now);
        report
    }

    fn known_ids(&self) -> Vec<CredentialId> {
        self.windows.iter().map(|e| e.key().clone()).collect()
    }

    /// Every credential visible to the tenant, in selection order.
    pub fn pool_status(&self, tenant_id: &TenantId) -> Vec<CredentialStatus> {
        let registry = self.credentials.load();
        let mut visible: Vec<&Arc<ModelCredential>> = registry
            .iter()
            .filter(|c| c.tenant_id.as_ref().is_none_or(|owner| owner == tenant_id))
            .collect();
        visible.sort_by_key(|c| (c.tenant_id.is_none(), c.priority));

        visible
            .into_iter()
            .map(|c| CredentialStatus {
                id: c.id.clone(),
                model: c.model_name.clone(),
                shared: c.tenant_id.is_none(),
                priority: c.priority,
                is_active: c.is_active,
                windows: self
                    .windows
                    .get(&c.id)
                    .map(|w| w.iter().copied().collect())
                    .unwrap_or_default(),
                exhausted_until: self.exhausted.get(&c.id).map(|e| e.until),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use proptest::prelude::*;
    use tijara_core::{ApiKey, TokenUsage, WindowLimits};

    use super::*;

    /// Returns queued outcomes in order and remembers which model was asked.
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<String, TijaraError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<String, TijaraError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "gemini"
        }

        async fn generate(
            &self,
            _prompt: &str,
            credential: &ModelCredential,
        ) -> Result<Completion, TijaraError> {
            self.calls
                .lock()
                .unwrap()
                .push(credential.model_name.clone());
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default".to_string()));
            next.map(|text| Completion {
                text,
                usage: TokenUsage::default(),
            })
        }
    }

    fn tenant() -> TenantId {
        TenantId::new("shop-1").unwrap()
    }

    fn cred(id: &str, tenant: Option<&str>, priority: i32, rpm: u32) -> ModelCredential {
        ModelCredential {
            id: id.into(),
            tenant_id: tenant.map(|t| TenantId::new(t).unwrap()),
            provider: "gemini".into(),
            api_key: ApiKey::new(format!("key-{id}")),
            model_name: format!("model-{id}"),
            priority,
            is_active: true,
            limits: WindowLimits {
                rpm,
                rph: 100,
                rpd: 1000,
            },
        }
    }

    fn rate_limited(model: &str) -> TijaraError {
        TijaraError::RateLimited {
            model: model.into(),
            violation: QuotaViolation {
                quota_id: "GenerateRequestsPerMinutePerProjectPerModel".into(),
                quota_value: Some(15),
                retry_after: None,
            },
        }
    }

    fn pool_with(
        creds: Vec<ModelCredential>,
        provider: Arc<ScriptedProvider>,
    ) -> ModelPool {
        ModelPool::new(&PoolConfig::default(), creds, vec![provider])
    }

    #[test]
    fn skips_model_whose_minute_window_is_full() {
        let pool = pool_with(
            vec![cred("A", Some("shop-1"), 1, 1), cred("B", Some("shop-1"), 2, 10)],
            ScriptedProvider::new(vec![]),
        );
        let now = Utc::now();
        pool.restore_window(
            &"A".into(),
            UsageWindow {
                kind: WindowKind::Rpm,
                used_count: 1,
                limit: 1,
                window_start: Some(now),
            },
        );
        let chosen = pool.select_model(&tenant(), now).unwrap();
        assert_eq!(chosen.id.as_str(), "B");
    }

    #[test]
    fn tenant_tier_before_shared_and_foreign_hidden() {
        let pool = pool_with(
            vec![
                cred("shared", None, 0, 10),
                cred("mine", Some("shop-1"), 9, 10),
                cred("theirs", Some("shop-2"), 0, 10),
            ],
            ScriptedProvider::new(vec![]),
        );
        let now = Utc::now();
        assert_eq!(pool.select_model(&tenant(), now).unwrap().id.as_str(), "mine");

        let other = TenantId::new("shop-3").unwrap();
        assert_eq!(pool.select_model(&other, now).unwrap().id.as_str(), "shared");
    }

    #[test]
    fn equal_priority_prefers_larger_daily_budget() {
        let pool = pool_with(
            vec![cred("A", None, 1, 10), cred("B", None, 1, 10)],
            ScriptedProvider::new(vec![]),
        );
        let now = Utc::now();
        pool.restore_window(
            &"A".into(),
            UsageWindow {
                kind: WindowKind::Rpd,
                used_count: 500,
                limit: 1000,
                window_start: Some(now),
            },
        );
        assert_eq!(pool.select_model(&tenant(), now).unwrap().id.as_str(), "B");
    }

    #[tokio::test]
    async fn rate_limit_fails_over_to_next_model() {
        let provider = ScriptedProvider::new(vec![
            Err(rate_limited("model-A")),
            Ok("hello".to_string()),
        ]);
        let pool = pool_with(
            vec![cred("A", None, 1, 10), cred("B", None, 2, 10)],
            Arc::clone(&provider),
        );

        let result = pool.invoke("hi", &tenant()).await.unwrap();
        assert_eq!(result.model, "model-B");
        assert_eq!(result.attempts, 2);
        assert_eq!(provider.calls(), vec!["model-A", "model-B"]);
        assert!(pool.is_exhausted(&"A".into(), Utc::now()));
        assert!(!pool.is_exhausted(&"B".into(), Utc::now()));
    }

    #[tokio::test]
    async fn two_rate_limits_exhaust_the_pool() {
        let provider = ScriptedProvider::new(vec![
            Err(rate_limited("model-A")),
            Err(rate_limited("model-B")),
        ]);
        let pool = pool_with(
            vec![
                cred("A", None, 1, 10),
                cred("B", None, 2, 10),
                cred("C", None, 3, 10),
            ],
            Arc::clone(&provider),
        );

        let err = pool.invoke("hi", &tenant()).await.unwrap_err();
        assert!(matches!(err, TijaraError::PoolExhausted { .. }));
        assert_eq!(provider.calls().len(), 2, "attempts are capped at two");
    }

    #[tokio::test]
    async fn provider_error_does_not_mark_exhausted() {
        let provider = ScriptedProvider::new(vec![
            Err(TijaraError::Provider {
                message: "503".into(),
                source: None,
            }),
            Ok("recovered".to_string()),
        ]);
        let pool = pool_with(vec![cred("A", None, 1, 10)], Arc::clone(&provider));

        let result = pool.invoke("hi", &tenant()).await.unwrap();
        assert_eq!(result.completion.text, "recovered");
        assert_eq!(provider.calls(), vec!["model-A", "model-A"]);
        assert!(!pool.is_exhausted(&"A".into(), Utc::now()));
    }

    #[tokio::test]
    async fn success_records_all_windows() {
        let provider = ScriptedProvider::new(vec![Ok("ok".to_string())]);
        let pool = pool_with(vec![cred("A", None, 1, 1)], provider);

        pool.invoke("hi", &tenant()).await.unwrap();
        let status = pool.pool_status(&tenant());
        assert!(status[0].windows.iter().all(|w| w.used_count == 1));

        let err = pool.select_model(&tenant(), Utc::now()).unwrap_err();
        assert!(matches!(err, TijaraError::PoolExhausted { .. }));
    }

    #[test]
    fn quota_value_lowers_tracked_limit() {
        let pool = pool_with(vec![cred("A", None, 1, 10)], ScriptedProvider::new(vec![]));
        let now = Utc::now();
        let a = pool.select_model(&tenant(), now).unwrap();
        pool.mark_exhausted(
            &a,
            &QuotaViolation {
                quota_id: "GenerateRequestsPerDayPerProjectPerModel".into(),
                quota_value: Some(200),
                retry_after: Some(Duration::from_secs(5)),
            },
            now,
        );
        let status = pool.pool_status(&tenant());
        let rpd = status[0]
            .windows
            .iter()
            .find(|w| w.kind == WindowKind::Rpd)
            .unwrap();
        assert_eq!(rpd.limit, 200);
        assert_eq!(status[0].exhausted_until, Some(now + TimeDelta::seconds(5)));
    }

    #[test]
    fn sweep_recovers_models_without_traffic() {
        let pool = pool_with(vec![cred("A", None, 1, 1)], ScriptedProvider::new(vec![]));
        let now = Utc::now();
        pool.restore_window(
            &"A".into(),
            UsageWindow {
                kind: WindowKind::Rpm,
                used_count: 1,
                limit: 1,
                window_start: Some(now),
            },
        );
        assert!(pool.select_model(&tenant(), now).is_err());

        let report = pool.sweep(now + TimeDelta::seconds(61));
        assert_eq!(report.windows_reset, 1);
        assert!(pool.select_model(&tenant(), now + TimeDelta::seconds(61)).is_ok());
    }

    #[test]
    fn deactivated_credential_is_never_selected() {
        let pool = pool_with(
            vec![cred("A", None, 1, 10), cred("B", None, 2, 10)],
            ScriptedProvider::new(vec![]),
        );
        assert!(pool.deactivate(&"A".into()));
        assert!(!pool.deactivate(&"missing".into()));
        assert_eq!(
            pool.select_model(&tenant(), Utc::now()).unwrap().id.as_str(),
            "B"
        );
    }

    #[test]
    fn replacing_registry_keeps_surviving_counters() {
        let pool = pool_with(vec![cred("A", None, 1, 10)], ScriptedProvider::new(vec![]));
        let now = Utc::now();
        pool.restore_window(
            &"A".into(),
            UsageWindow {
                kind: WindowKind::Rpm,
                used_count: 4,
                limit: 10,
                window_start: Some(now),
            },
        );
        pool.replace_credentials(vec![cred("A", None, 1, 10), cred("B", None, 2, 10)]);
        let status = pool.pool_status(&tenant());
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].windows[0].used_count, 4);
    }

    proptest! {
        #[test]
        fn marking_one_model_leaves_others_untouched(
            n in 2usize..8,
            victim in 0usize..8,
        ) {
            let victim = victim % n;
            let creds: Vec<ModelCredential> = (0..n)
                .map(|i| cred(&format!("c{i}"), None, i as i32, 10))
                .collect();
            let pool = pool_with(creds.clone(), ScriptedProvider::new(vec![]));
            let now = Utc::now();
            let before: Vec<bool> = creds.iter().map(|c| pool.is_usable(c, now)).collect();

            pool.mark_exhausted(&creds[victim], &QuotaViolation {
                quota_id: "GenerateRequestsPerMinutePerProjectPerModel".into(),
                quota_value: None,
                retry_after: None,
            }, now);

            for (i, c) in creds.iter().enumerate() {
                if i == victim {
                    prop_assert!(!pool.is_usable(c, now));
                } else {
                    prop_assert_eq!(pool.is_usable(c, now), before[i]);
                }
            }
        }
    }
}
