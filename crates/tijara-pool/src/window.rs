// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-model request counters for the minute, hour, and day windows.
//!
//! Windows are plain values: `record_use` and `sweep` return new windows
//! instead of mutating in place, so the pool can swap them under a
//! per-credential map entry without holding any wider lock.

use chrono::{DateTime, TimeDelta, Utc};
use strum::{Display, EnumString};
use tijara_core::WindowLimits;

/// Length of a rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum WindowKind {
    Rpm,
    Rph,
    Rpd,
}

impl WindowKind {
    pub const ALL: [WindowKind; 3] = [WindowKind::Rpm, WindowKind::Rph, WindowKind::Rpd];

    pub fn span(self) -> TimeDelta {
        match self {
            WindowKind::Rpm => TimeDelta::minutes(1),
            WindowKind::Rph => TimeDelta::hours(1),
            WindowKind::Rpd => TimeDelta::days(1),
        }
    }

    fn index(self) -> usize {
        match self {
            WindowKind::Rpm => 0,
            WindowKind::Rph => 1,
            WindowKind::Rpd => 2,
        }
    }
}

/// Request counter for one window of one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub kind: WindowKind,
    pub used_count: u32,
    pub limit: u32,
    /// `None` means the window is fresh and has not been used since its last reset.
    pub window_start: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn new(kind: WindowKind, limit: u32) -> Self {
        Self {
            kind,
            used_count: 0,
            limit,
            window_start: None,
        }
    }

    /// A window accepts another request when it is fresh or below its limit.
    pub fn is_available(&self) -> bool {
        self.window_start.is_none() || self.used_count < self.limit
    }

    /// Counts one request, opening the window at `now` if it was fresh.
    #[must_use]
    pub fn record_use(self, now: DateTime<Utc>) -> Self {
        Self {
            used_count: self.used_count.saturating_add(1),
            window_start: Some(self.window_start.unwrap_or(now)),
            ..self
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.window_start {
            Some(start) => now - start >= self.kind.span(),
            None => false,
        }
    }

    /// Resets an expired window; leaves any other window untouched.
    #[must_use]
    pub fn sweep(self, now: DateTime<Utc>) -> Self {
        if self.is_expired(now) {
            Self {
                used_count: 0,
                window_start: None,
                ..self
            }
        } else {
            self
        }
    }

    pub fn remaining(&self) -> u32 {
        if self.window_start.is_none() {
            self.limit
        } else {
            self.limit.saturating_sub(self.used_count)
        }
    }

    /// When the window will next reset, if it is open.
    pub fn resets_at(&self) -> Option<DateTime<Utc>> {
        self.window_start.map(|start| start + self.kind.span())
    }
}

/// Resets every window in `windows` whose span has elapsed at `now`.
pub fn sweep(windows: &[UsageWindow], now: DateTime<Utc>) -> Vec<UsageWindow> {
    windows.iter().map(|w| w.sweep(now)).collect()
}

/// The three windows tracked for a single credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialWindows {
    windows: [UsageWindow; 3],
}

impl CredentialWindows {
    pub fn new(limits: WindowLimits) -> Self {
        Self {
            windows: [
                UsageWindow::new(WindowKind::Rpm, limits.rpm),
                UsageWindow::new(WindowKind::Rph, limits.rph),
                UsageWindow::new(WindowKind::Rpd, limits.rpd),
            ],
        }
    }

    pub fn get(&self, kind: WindowKind) -> &UsageWindow {
        &self.windows[kind.index()]
    }

    pub fn set(&mut self, window: UsageWindow) {
        self.windows[window.kind.index()] = window;
    }

    pub fn all_available(&self) -> bool {
        self.windows.iter().all(UsageWindow::is_available)
    }

    pub fn record_use(&mut self, now: DateTime<Utc>) {
        for w in &mut self.windows {
            *w = w.record_use(now);
        }
    }

    /// Sweeps all three windows and returns how many were reset.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut reset = 0;
        for w in &mut self.windows {
            let swept = w.sweep(now);
            if swept != *w {
                reset += 1;
            }
            *w = swept;
        }
        reset
    }

    /// Lowers the limit of one window to a provider-reported quota.
    pub fn lower_limit(&mut self, kind: WindowKind, quota: u32) {
        let w = &mut self.windows[kind.index()];
        if quota < w.limit {
            w.limit = quota;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UsageWindow> {
        self.windows.iter()
    }
}
