// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local cache of models temporarily unusable after a quota violation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tijara_core::CredentialId;

use crate::window::WindowKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustedEntry {
    pub until: DateTime<Utc>,
    pub kind: WindowKind,
    /// Quota limit the provider reported, if any.
    pub source_quota_value: Option<u64>,
}

/// Exhaustion marks keyed by credential. Each operation locks one shard entry.
#[derive(Debug, Default)]
pub struct ExhaustedModels {
    entries: DashMap<CredentialId, ExhaustedEntry>,
}

impl ExhaustedModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one credential exhausted, keeping the later expiry if already marked.
    pub fn mark(&self, id: &CredentialId, entry: ExhaustedEntry) {
        self.entries
            .entry(id.clone())
            .and_modify(|existing| {
                if entry.until > existing.until {
                    *existing = entry;
                }
            })
            .or_insert(entry);
    }

    /// Whether `id` is exhausted at `now`. Expired entries are purged on the way.
    pub fn is_exhausted(&self, id: &CredentialId, now: DateTime<Utc>) -> bool {
        self.entries.remove_if(id, |_, e| now > e.until);
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &CredentialId) -> Option<ExhaustedEntry> {
        self.entries.get(id).map(|e| *e)
    }

    pub fn clear(&self, id: &CredentialId) {
        self.entries.remove(id);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| now <= e.until);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
