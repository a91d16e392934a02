//! Credential repository trait.

use crate::error::Result;
use crate::state::{AccountStatus, Credential, NewCredential, UserId};
use chrono::{DateTime, Utc};

/// Credential repository.
///
/// Persistence for the credential fields of a user account. Profile fields
/// (nickname, avatar, bio) live elsewhere and are not visible here.
///
/// # Implementation Notes
///
/// - `username` and `email` are unique
/// - Lookups return `Ok(None)` for unknown keys; only infrastructure
///   failures are errors
pub trait CredentialStore: Send + Sync {
    /// Find a credential by username.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credential>>> + Send;

    /// Find a credential by email.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Credential>>> + Send;

    /// Find a credential by user ID.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_id(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<Credential>>> + Send;

    /// Whether `username` is registered.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn username_exists(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Whether `email` is registered.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn email_exists(&self, email: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Create an `inactive` credential.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::UsernameTaken`] or
    /// [`crate::AuthError::EmailTaken`] on a uniqueness violation, or a
    /// database error.
    fn create_credential(
        &self,
        credential: NewCredential,
    ) -> impl std::future::Future<Output = Result<Credential>> + Send;

    /// Replace the stored `salt:hash` value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::ResourceNotFound`] for an unknown user, or
    /// a database error.
    fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Set the account status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::ResourceNotFound`] for an unknown user, or
    /// a database error.
    fn update_status(
        &self,
        user_id: UserId,
        status: AccountStatus,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Record a completed login.
    ///
    /// # Errors
    ///
    /// Returns error if the database update fails.
    fn record_login(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
