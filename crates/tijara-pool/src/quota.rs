// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps provider quota violations to window kinds and exhaustion expiries.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tijara_config::model::PoolConfig;
use tijara_core::QuotaViolation;

use crate::window::WindowKind;

/// Window kind implied by a provider quota identifier.
///
/// Unrecognised identifiers map to the minute window, the shortest penalty.
pub fn window_for_quota(quota_id: &str) -> WindowKind {
    if quota_id.contains("PerDay") {
        WindowKind::Rpd
    } else if quota_id.contains("PerHour") {
        WindowKind::Rph
    } else {
        WindowKind::Rpm
    }
}

/// Exhaustion TTLs per window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustionPolicy {
    pub minute: Duration,
    pub hour: Duration,
    pub day: Duration,
}

impl Default for ExhaustionPolicy {
    fn default() -> Self {
        Self::from_config(&PoolConfig::default())
    }
}

impl ExhaustionPolicy {
    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            minute: Duration::from_secs(config.minute_exhaustion_secs),
            hour: Duration::from_secs(config.hour_exhaustion_secs),
            day: Duration::from_secs(config.day_exhaustion_secs),
        }
    }

    pub fn ttl(&self, kind: WindowKind) -> Duration {
        match kind {
            WindowKind::Rpm => self.minute,
            WindowKind::Rph => self.hour,
            WindowKind::Rpd => self.day,
        }
    }

    /// When a model hit by `violation` becomes selectable again.
    ///
    /// A provider `retryDelay` wins. Otherwise a daily violation lasts until
    /// the tracked day window rolls over (capped by the configured TTL), and
    /// everything else lasts for the configured TTL.
    pub fn exhausted_until(
        &self,
        violation: &QuotaViolation,
        now: DateTime<Utc>,
        day_window_resets_at: Option<DateTime<Utc>>,
    ) -> (WindowKind, DateTime<Utc>) {
        let kind = window_for_quota(&violation.quota_id);
        if let Some(delay) = violation.retry_after {
            return (kind, now + to_delta(delay));
        }
        let configured = now + to_delta(self.ttl(kind));
        let until = match (kind, day_window_resets_at) {
            (WindowKind::Rpd, Some(reset)) if reset > now => reset.min(configured),
            _ => configured,
        };
        (kind, until)
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
