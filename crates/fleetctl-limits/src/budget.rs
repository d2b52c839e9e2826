use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

struct BudgetWindow {
    used: u64,
    reset_at: DateTime<Utc>,
}

/// Daily token budget, reset lazily at UTC midnight on first access past the
/// stored `reset_at`. No background sweep is needed: every method call
/// checks whether `now` has crossed the boundary and resets in place.
pub struct TokenBudget {
    limit: u64,
    state: Mutex<HashMap<String, BudgetWindow>>,
}

fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
    Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::MIN))
}

impl TokenBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            state: Mutex::new(HashMap::new()),
        }
    }

    fn window_for<'a>(
        state: &'a mut HashMap<String, BudgetWindow>,
        key: &str,
        now: DateTime<Utc>,
    ) -> &'a mut BudgetWindow {
        let window = state.entry(key.to_string()).or_insert_with(|| BudgetWindow {
            used: 0,
            reset_at: next_utc_midnight(now),
        });
        if now >= window.reset_at {
            window.used = 0;
            window.reset_at = next_utc_midnight(now);
        }
        window
    }

    /// `true` if `key` has at least one token of budget remaining right now.
    /// A `limit` of 0 means unlimited (no budget configured).
    pub fn allow(&self, key: &str) -> bool {
        if self.limit == 0 {
            return true;
        }
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let window = Self::window_for(&mut state, key, now);
        window.used < self.limit
    }

    /// Records `n` tokens of usage against `key`'s current window.
    pub fn record_usage(&self, key: &str, n: u64) {
        if self.limit == 0 {
            return;
        }
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let window = Self::window_for(&mut state, key, now);
        window.used = window.used.saturating_add(n);
    }

    /// Remaining tokens for `key` in the current window.
    pub fn remaining(&self, key: &str) -> u64 {
        if self.limit == 0 {
            return u64::MAX;
        }
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let window = Self::window_for(&mut state, key, now);
        self.limit.saturating_sub(window.used)
    }
}
