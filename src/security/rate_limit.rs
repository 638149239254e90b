//! Per-client sliding window rate limiting.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use dashmap::DashMap;

/// Per-client timestamps of recent qualifying actions.
///
/// Cheap to clone; clones share the same windows. The server keeps one
/// instance for the process lifetime and hands it to every pipeline it builds,
/// so windows survive config reloads.
#[derive(Debug, Clone, Default)]
pub struct ClientWindows {
    inner: Arc<DashMap<String, VecDeque<NaiveDateTime>>>,
}

impl ClientWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored timestamps for one client, oldest first.
    pub fn snapshot(&self, client: &str) -> Vec<NaiveDateTime> {
        self.inner
            .get(client)
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of clients with a window.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

/// Admits at most `limit` actions per client in any rolling `window`.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: TimeDelta,
    windows: ClientWindows,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window: TimeDelta, windows: ClientWindows) -> Self {
        Self {
            limit,
            window,
            windows,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn windows(&self) -> &ClientWindows {
        &self.windows
    }

    /// Prune, decide, and record `now` only when admitted.
    ///
    /// A timestamp exactly `window` old has expired. The entry guard holds the
    /// shard lock for the whole check, so concurrent calls for one client are
    /// serialized.
    pub fn admit(&self, client: &str, now: NaiveDateTime) -> Admission {
        let mut entry = self.windows.inner.entry(client.to_string()).or_default();
        let stamps = entry.value_mut();

        stamps.retain(|stamp| now - *stamp < self.window);

        if stamps.len() >= self.limit {
            return Admission::Denied;
        }

        // Keep the sequence non-decreasing if the wall clock stepped back.
        let stamp = stamps.back().map_or(now, |last| now.max(*last));
        stamps.push_back(stamp);
        Admission::Allowed
    }
}
