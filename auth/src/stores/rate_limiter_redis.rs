//! Redis-based fixed-window rate limiter.
//!
//! # Algorithm
//!
//! Each scope has one counter at `rate_limit:{scope}`. An atomic pipeline
//! runs `INCR` followed by `EXPIRE ... NX`, so the expiry is set only when
//! the counter is created and later increments never extend the window.
//! `EXPIRE NX` requires Redis 7.
//!
//! # Example
//!
//! ```no_run
//! use trustgate_auth::stores::RedisRateLimiter;
//! use trustgate_auth::providers::RateLimiter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = RedisRateLimiter::new("redis://127.0.0.1:6379").await?;
//! let count = limiter.increment("ip:203.0.113.7").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::{RATE_LIMIT_WINDOW_SECS, keys};
use crate::error::{AuthError, Result};
use crate::providers::RateLimiter;
use crate::stores::connect;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis-based fixed-window rate limiter.
#[derive(Clone)]
pub struct RedisRateLimiter {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Window length.
    window: Duration,
}

impl RedisRateLimiter {
    /// Create a new Redis rate limiter with a 24 hour window.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            conn_manager: connect(redis_url).await?,
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
        })
    }

    /// Set the window length.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    fn key(scope: &str) -> String {
        format!("{}{scope}", keys::RATE_LIMIT)
    }
}

impl RateLimiter for RedisRateLimiter {
    async fn increment(&self, scope: &str) -> Result<u64> {
        let mut conn = self.conn_manager.clone();
        let key = Self::key(scope);
        let window_secs = self.window.as_secs().max(1);

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(window_secs)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(scope = %scope, error = %e, "Rate limit increment failed");
                AuthError::DownstreamUnavailable(format!("Failed to increment rate limit: {e}"))
            })?;

        tracing::debug!(scope = %scope, count, "Rate limit counter incremented");
        Ok(count)
    }

    async fn retry_after(&self, scope: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn_manager.clone();

        let ttl: i64 = conn.ttl(Self::key(scope)).await.map_err(|e| {
            AuthError::DownstreamUnavailable(format!("Failed to read rate limit TTL: {e}"))
        })?;

        // -2: no key, -1: no expiry
        #[allow(clippy::cast_sign_loss)] // Safe: guarded by ttl > 0
        Ok((ttl > 0).then(|| Duration::from_secs(ttl as u64)))
    }
}
