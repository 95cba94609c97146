// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant-keyed cache of approved patterns.
//!
//! Each tenant's entry is locked independently by `DashMap`. Every
//! invalidation bumps a per-tenant generation counter; a load that started
//! under an older generation is discarded instead of stored, so a slow
//! repository read can never resurrect patterns that were invalidated while
//! it was in flight.
//!
//! The cache also remembers the last conflict report fingerprint per tenant,
//! so an unchanged prompt and pattern set is reported once per generation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tijara_core::TenantId;

use crate::payload::Pattern;

#[derive(Debug, Clone)]
struct CacheEntry {
    patterns: Arc<Vec<Pattern>>,
    loaded_at: Instant,
}

#[derive(Debug)]
pub struct PatternCache {
    entries: DashMap<TenantId, CacheEntry>,
    generations: DashMap<TenantId, u64>,
    /// `(generation, fingerprint)` of the last reported conflict set.
    reported: DashMap<TenantId, (u64, u64)>,
    ttl: Duration,
}

impl PatternCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            reported: DashMap::new(),
            ttl,
        }
    }

    /// Returns the tenant's patterns if loaded less than `ttl` ago.
    pub fn get(&self, tenant_id: &TenantId) -> Option<Arc<Vec<Pattern>>> {
        self.get_at(tenant_id, Instant::now())
    }

    pub fn get_at(&self, tenant_id: &TenantId, now: Instant) -> Option<Arc<Vec<Pattern>>> {
        let entry = self.entries.get(tenant_id)?;
        if now.saturating_duration_since(entry.loaded_at) < self.ttl {
            Some(Arc::clone(&entry.patterns))
        } else {
            None
        }
    }

    /// Current generation; capture before loading and pass to [`Self::store`].
    pub fn generation(&self, tenant_id: &TenantId) -> u64 {
        self.generations.get(tenant_id).map(|g| *g).unwrap_or(0)
    }

    /// Stores a load result unless the tenant was invalidated since `generation`.
    ///
    /// Returns whether the entry was stored.
    pub fn store(&self, tenant_id: &TenantId, generation: u64, patterns: Arc<Vec<Pattern>>) -> bool {
        // Hold the generation shard while inserting so an invalidation
        // cannot slip between the check and the insert.
        let current = self.generations.entry(tenant_id.clone()).or_insert(0);
        if *current != generation {
            return false;
        }
        self.entries.insert(
            tenant_id.clone(),
            CacheEntry {
                patterns,
                loaded_at: Instant::now(),
            },
        );
        drop(current);
        true
    }

    /// Records a conflict report fingerprint for the current generation.
    ///
    /// Returns `false` when the same fingerprint was already recorded since
    /// the last invalidation.
    pub fn first_report(&self, tenant_id: &TenantId, fingerprint: u64) -> bool {
        let key = (self.generation(tenant_id), fingerprint);
        match self.reported.entry(tenant_id.clone()) {
            Entry::Occupied(mut seen) => {
                if *seen.get() == key {
                    return false;
                }
                seen.insert(key);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(key);
                true
            }
        }
    }

    /// Drops the tenant's entry and fences off in-flight loads.
    pub fn invalidate(&self, tenant_id: &TenantId) {
        let mut generation = self.generations.entry(tenant_id.clone()).or_insert(0);
        *generation += 1;
        self.entries.remove(tenant_id);
        self.reported.remove(tenant_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
