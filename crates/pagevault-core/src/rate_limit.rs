//! Per-client request rate limiting.
//!
//! Limiting is abuse dampening, not a security boundary. Each process (or
//! each database, for the SQLite-backed limiter in `pagevault-store`) keeps
//! its own counters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

/// Window parameters: at most `max_requests` per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_ms: i64,
}

impl RateLimitPolicy {
    /// Create a policy.
    pub const fn new(max_requests: u32, window_ms: i64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }
}

impl Default for RateLimitPolicy {
    /// 20 requests per 10 seconds.
    fn default() -> Self {
        Self::new(20, 10_000)
    }
}

/// Decides whether a client has exceeded its request budget.
///
/// Every call counts as one request attempt. Implementations must be safe
/// to share across request handlers, and must not block the async runtime.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record a request from `key` at `now_ms` and report whether it must be
    /// rejected.
    async fn is_limited(&self, key: &str, now_ms: i64) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: i64,
}

/// In-memory fixed-window limiter.
///
/// A window opens on the first request from a new key and lasts
/// `window_ms`. Within it the first `max_requests` requests pass and the
/// rest are rejected.
///
/// Expired windows are swept once the map grows large, at most once per
/// `window_ms`.
pub struct FixedWindowLimiter {
    policy: RateLimitPolicy,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    windows: HashMap<String, Window>,
    last_prune: Option<i64>,
}

impl LimiterState {
    fn maybe_prune(&mut self, now_ms: i64, window_ms: i64) {
        if self.windows.len() < PRUNE_THRESHOLD {
            return;
        }
        let due = self
            .last_prune
            .map_or(true, |at| now_ms.saturating_sub(at) >= window_ms);
        if due {
            self.windows.retain(|_, w| w.reset_at >= now_ms);
            self.last_prune = Some(now_ms);
        }
    }
}

/// Tracked keys above which expired windows are swept.
const PRUNE_THRESHOLD: usize = 10_000;

impl FixedWindowLimiter {
    /// Create a limiter with the given policy.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .windows
            .len()
    }

    fn hit(&self, key: &str, now_ms: i64) -> bool {
        // A poisoned lock only means another handler panicked mid-update;
        // the counters are still usable.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.maybe_prune(now_ms, self.policy.window_ms);
        let windows = &mut state.windows;

        match windows.get_mut(key) {
            Some(window) if window.reset_at >= now_ms => {
                if window.count >= self.policy.max_requests {
                    tracing::debug!(client = key, "rate limit exceeded");
                    return true;
                }
                window.count += 1;
                false
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now_ms + self.policy.window_ms,
                    },
                );
                self.policy.max_requests == 0
            }
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn is_limited(&self, key: &str, now_ms: i64) -> bool {
        self.hit(key, now_ms)
    }
}
