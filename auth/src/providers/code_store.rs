//! One-time verification code store trait.

use crate::error::Result;
use chrono::Duration;

/// Short-lived one-time codes keyed by caller-chosen keys.
///
/// Callers own the namespacing: registration and activation codes use the
/// bare email, reset codes use [`crate::constants::code_keys::reset`].
/// Setting a key replaces any previous code under it.
pub trait VerificationCodeStore: Send + Sync {
    /// Store `code` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn set(
        &self,
        key: &str,
        code: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fetch the code under `key`, `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;

    /// Delete the code under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unavailable.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
