//! Access token revocation list trait.

use crate::error::Result;
use crate::state::UserId;
use chrono::Duration;

/// Revoked access tokens.
///
/// An entry only needs to outlive the token's natural expiry, after which
/// signature validation rejects the token anyway. Adapters therefore store
/// each entry with the token's remaining lifetime as TTL.
pub trait AccessRevocationList: Send + Sync {
    /// Revoke `token` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn add(
        &self,
        user_id: UserId,
        token: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Whether `token` has been revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn is_blacklisted(&self, token: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}
