//! SQLite-backed fixed-window rate limiter.
//!
//! Same window semantics as [`pagevault_core::FixedWindowLimiter`], but the
//! counters live in the `rate_limits` table, so every process that opens the
//! same database file sees the same limits.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use pagevault_core::{RateLimitPolicy, RateLimiter};

use crate::error::{Result, StoreError};

/// Rate limiter sharing its counters through SQLite.
///
/// Counter updates run on the blocking pool, so a database locked by
/// another process stalls only the request being limited.
///
/// Storage failures fail open: a request is let through and a warning is
/// logged. Limiting dampens abuse; it is not an access control.
pub struct SqliteRateLimiter {
    conn: Arc<Mutex<Connection>>,
    policy: RateLimitPolicy,
}

impl SqliteRateLimiter {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>, policy: RateLimitPolicy) -> Self {
        Self { conn, policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    async fn hit(&self, key: &str, now_ms: i64) -> Result<bool> {
        let conn = self.conn.clone();
        let policy = self.policy;
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            hit_window(&conn, policy, &key, now_ms)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn hit_window(conn: &Connection, policy: RateLimitPolicy, key: &str, now_ms: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;

    let window: Option<(u32, i64)> = tx
        .query_row(
            "SELECT count, reset_at FROM rate_limits WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let limited = match window {
        Some((count, reset_at)) if reset_at >= now_ms => {
            if count >= policy.max_requests {
                true
            } else {
                tx.execute(
                    "UPDATE rate_limits SET count = count + 1 WHERE key = ?1",
                    params![key],
                )?;
                false
            }
        }
        _ => {
            tx.execute(
                "DELETE FROM rate_limits WHERE reset_at < ?1",
                params![now_ms],
            )?;
            tx.execute(
                "INSERT INTO rate_limits (key, count, reset_at) VALUES (?1, 1, ?2)
                 ON CONFLICT (key) DO UPDATE SET count = 1, reset_at = excluded.reset_at",
                params![key, now_ms + policy.window_ms],
            )?;
            policy.max_requests == 0
        }
    };

    tx.commit()?;
    Ok(limited)
}

#[async_trait]
impl RateLimiter for SqliteRateLimiter {
    async fn is_limited(&self, key: &str, now_ms: i64) -> bool {
        match self.hit(key, now_ms).await {
            Ok(limited) => limited,
            Err(e) => {
                tracing::warn!(error = %e, "rate limiter storage failed, allowing request");
                false
            }
        }
    }
}
