//! Refresh session store trait.

use crate::error::Result;
use crate::state::UserId;
use chrono::Duration;

/// Refresh session store.
///
/// Holds at most one live refresh token per user, indexed both ways:
///
/// - forward: user → token
/// - reverse: token → user
///
/// Both entries carry the same TTL (the refresh token lifetime).
///
/// # Implementation Notes
///
/// - `store` overwrites the previous forward entry, which invalidates the
///   previous refresh token even though its reverse entry may linger
/// - A reverse entry without a matching forward entry is stale and must not
///   validate
pub trait SessionStore: Send + Sync {
    /// Store `token` as the user's only live refresh token.
    ///
    /// Forward and reverse entries are written atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn store(
        &self,
        user_id: UserId,
        token: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Whether `token` is the user's live refresh token.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn validate(
        &self,
        user_id: UserId,
        token: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Delete the user's session. Absent entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn delete(&self, user_id: UserId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete the session that `token` belongs to.
    ///
    /// Removes the reverse entry, and the forward entry only while it still
    /// holds `token`. A token with no reverse entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn delete_by_token(&self, token: &str)
    -> impl std::future::Future<Output = Result<()>> + Send;
}
