//! Mock rate limiter for testing.

use crate::error::Result;
use crate::mocks::lock;
use crate::providers::RateLimiter;
use crate::constants::RATE_LIMIT_WINDOW_SECS;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory fixed-window rate limiter.
///
/// Same semantics as `RedisRateLimiter`: the window opens on the first
/// increment and is not extended afterwards.
#[derive(Debug, Clone)]
pub struct MockRateLimiter {
    /// Map of scope -> (count, window end)
    counters: Arc<Mutex<HashMap<String, (u64, Instant)>>>,
    window: Duration,
}

impl MockRateLimiter {
    /// Create a new mock rate limiter with a 24 hour window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
        }
    }

    /// Set the window length.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

impl Default for MockRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for MockRateLimiter {
    async fn increment(&self, scope: &str) -> Result<u64> {
        let now = Instant::now();
        let mut counters = lock(&self.counters)?;
        let entry = counters
            .entry(scope.to_string())
            .or_insert((0, now + self.window));

        if entry.1 <= now {
            *entry = (0, now + self.window);
        }
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn retry_after(&self, scope: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        Ok(lock(&self.counters)?
            .get(scope)
            .filter(|(_, end)| *end > now)
            .map(|(_, end)| *end - now))
    }
}
