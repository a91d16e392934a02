//! Storage implementations for the authentication core.
//!
//! - **Session Store** (Redis) - one refresh token per user, indexed both ways
//! - **Access Revocation List** (Redis) - revoked access tokens until natural expiry
//! - **Verification Code Store** (Redis) - short-lived one-time codes
//! - **Rate Limiter** (Redis) - fixed-window counters
//! - **Credential Store / Device Repository** (PostgreSQL) - durable records

use crate::error::{AuthError, Result};
use redis::Client;
use redis::aio::ConnectionManager;

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod code_redis;
pub mod rate_limiter_redis;
pub mod revocation_redis;
pub mod session_redis;

// Re-exports
#[cfg(feature = "postgres")]
pub use postgres::{PostgresCredentialStore, PostgresDeviceRepository};
pub use code_redis::RedisVerificationCodeStore;
pub use rate_limiter_redis::RedisRateLimiter;
pub use revocation_redis::RedisAccessRevocationList;
pub use session_redis::RedisSessionStore;

/// Open a Redis connection manager.
///
/// # Errors
///
/// Returns [`AuthError::DownstreamUnavailable`] if the URL is invalid or the
/// server cannot be reached.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager> {
    let client = Client::open(redis_url).map_err(|e| {
        AuthError::DownstreamUnavailable(format!("Failed to create Redis client: {e}"))
    })?;

    ConnectionManager::new(client).await.map_err(|e| {
        AuthError::DownstreamUnavailable(format!("Failed to create Redis connection manager: {e}"))
    })
}

/// Convert a TTL to whole milliseconds for `PSETEX` / `SET PX`.
///
/// Sub-millisecond remainders are dropped so an entry never outlives the
/// value it tracks. Non-positive durations become one millisecond, since
/// Redis rejects a zero expiry.
pub(crate) fn ttl_millis(ttl: chrono::Duration) -> u64 {
    #[allow(clippy::cast_sign_loss)] // Safe: clamped to >= 1
    let millis = ttl.num_milliseconds().max(1) as u64;
    millis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ttl_millis_never_exceeds_duration() {
        assert_eq!(ttl_millis(Duration::seconds(90)), 90_000);
        assert_eq!(ttl_millis(Duration::milliseconds(1500)), 1500);
        assert_eq!(ttl_millis(Duration::microseconds(2_999)), 2);
        assert_eq!(ttl_millis(Duration::zero()), 1);
        assert_eq!(ttl_millis(Duration::seconds(-3)), 1);
    }
}
