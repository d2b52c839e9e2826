use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter keyed by an arbitrary string (agent ID,
/// webhook agent, room ID, ...). One window of timestamps is kept per key;
/// entries older than the window are evicted on every call.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    /// `limit` of 0 falls back to the default of 20/min, matching the
    /// "non-positive configured values are replaced by defaults" rule used
    /// throughout this codebase's configuration handling.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
            window: if window.is_zero() { DEFAULT_WINDOW } else { window },
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }

    fn evict_stale(&self, entries: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        while let Some(front) = entries.front() {
            if now.signed_duration_since(*front).to_std().unwrap_or_default() > self.window {
                entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `true` and records the call if `key` is under its limit for
    /// the current window; returns `false` without recording otherwise.
    pub fn allow(&self, key: &str) -> bool {
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let entries = state.entry(key.to_string()).or_default();
        self.evict_stale(entries, now);

        if entries.len() as u32 >= self.limit {
            return false;
        }
        entries.push_back(now);
        true
    }

    /// Remaining calls `key` may make in the current window without
    /// recording anything.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let entries = state.entry(key.to_string()).or_default();
        self.evict_stale(entries, now);
        self.limit.saturating_sub(entries.len() as u32)
    }
}
