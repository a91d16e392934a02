//! Fixed-window rate limiter trait.
//!
//! Counters are keyed by scope (for example `ip:203.0.113.7`). The window
//! starts at the first increment and is not extended by later increments,
//! so a burst at the end of one window may be followed by a full budget in
//! the next.

use crate::error::Result;

/// Fixed-window request counter.
///
/// # Example
///
/// ```no_run
/// use trustgate_auth::providers::RateLimiter;
///
/// # async fn example(limiter: impl RateLimiter) -> trustgate_auth::Result<()> {
/// let count = limiter.increment("ip:203.0.113.7").await?;
/// if count > 10 {
///     // reject
/// }
/// # Ok(())
/// # }
/// ```
pub trait RateLimiter: Send + Sync {
    /// Increment the counter for `scope` and return the new count.
    ///
    /// The first increment in a window returns 1 and starts the window.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn increment(&self, scope: &str) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Time until the current window for `scope` resets, if one is open.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn retry_after(
        &self,
        scope: &str,
    ) -> impl std::future::Future<Output = Result<Option<std::time::Duration>>> + Send;
}
