//! Cooldown gate: suppress scaling while membership is settling.
//!
//! Whenever an instance joins or leaves the workload, the gate pushes the
//! cooldown deadline out by the add or remove window. Decisions made before
//! the deadline passes would act on statistics that do not yet reflect the
//! change.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::debug;

use zonescale_core::{CooldownWindows, InstanceId};

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Ready,
    Active { remaining: Duration },
}

/// Per-workload cooldown state.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    windows: CooldownWindows,
    /// Instances seen on the previous check; `None` before the first check.
    previous: Option<BTreeSet<InstanceId>>,
    /// Epoch milliseconds at which the cooldown ends.
    expires_at: Option<u64>,
}

impl CooldownGate {
    pub fn new(windows: CooldownWindows) -> Self {
        Self {
            windows,
            previous: None,
            expires_at: None,
        }
    }

    /// Epoch milliseconds at which the current cooldown ends, if any.
    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    /// Record the current membership and report whether scaling is allowed
    /// at `now_ms` (epoch milliseconds).
    ///
    /// The first check only records membership.
    pub fn validate(&mut self, current: &BTreeSet<InstanceId>, now_ms: u64) -> CooldownStatus {
        let changes = self.previous.as_ref().map(|previous| {
            (
                current.difference(previous).count(),
                previous.difference(current).count(),
            )
        });

        match changes {
            None => {
                self.previous = Some(current.clone());
            }
            Some((added, removed)) => {
                if added > 0 {
                    self.extend(now_ms, self.windows.add);
                }
                if removed > 0 {
                    self.extend(now_ms, self.windows.remove);
                }
                if added > 0 || removed > 0 {
                    debug!(added, removed, expires_at = self.expires_at, "membership changed");
                    self.previous = Some(current.clone());
                }
            }
        }

        match self.expires_at {
            Some(expires_at) if expires_at >= now_ms => CooldownStatus::Active {
                remaining: Duration::from_millis(expires_at - now_ms),
            },
            _ => CooldownStatus::Ready,
        }
    }

    fn extend(&mut self, now_ms: u64, window: Duration) {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let candidate = now_ms.saturating_add(window_ms);
        self.expires_at = Some(self.expires_at.map_or(candidate, |e| e.max(candidate)));
    }
}
