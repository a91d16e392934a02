//! Password digests and login-time credential checks.
//!
//! Stored password values have the form `salt:hash` where `salt` is 16
//! random bytes hex encoded and `hash` is `hex(SHA-256(password ‖ salt))`.
//! The format is kept for compatibility with existing rows; moving to a
//! memory-hard KDF is tracked separately.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};
use crate::providers::CredentialStore;
use crate::state::{AccountStatus, Credential};
use crate::utils::generate_salt;

/// Digest `password` with `salt`.
#[must_use]
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Produce a storable `salt:hash` value with a fresh salt.
///
/// # Examples
///
/// ```
/// use trustgate_auth::credentials::{make_password_hash, verify_password};
///
/// let stored = make_password_hash("Password123");
/// assert!(verify_password(&stored, "Password123"));
/// assert!(!verify_password(&stored, "password123"));
/// ```
#[must_use]
pub fn make_password_hash(password: &str) -> String {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    format!("{salt}:{hash}")
}

/// Check `password` against a stored `salt:hash` value.
///
/// Malformed stored values never match.
#[must_use]
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt, expected)) = stored.split_once(':') else {
        return false;
    };
    if salt.is_empty() || expected.is_empty() {
        return false;
    }

    let actual = hash_password(password, salt);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

/// Decide whether an account in its current status may log in.
///
/// An inactive account is let through only while it is inside the activation
/// grace window and has never logged in; that first login bootstraps it.
///
/// # Errors
///
/// Returns [`AuthError::AccountBanned`] or [`AuthError::AccountInactive`].
pub fn check_status(credential: &Credential, now: DateTime<Utc>, grace: Duration) -> Result<()> {
    match credential.status {
        AccountStatus::Active => Ok(()),
        AccountStatus::Banned => Err(AuthError::AccountBanned),
        AccountStatus::Inactive => {
            let in_grace = now - credential.created_at <= grace;
            if in_grace && credential.is_first_login() {
                Ok(())
            } else {
                Err(AuthError::AccountInactive)
            }
        }
    }
}

/// Verify a username/password pair and the account's status.
///
/// Unknown usernames, malformed stored hashes and wrong passwords all yield
/// [`AuthError::InvalidCredentials`]. Status errors are only reported after
/// the password matched. Nothing is written.
///
/// # Errors
///
/// Returns the credential or status error, or a store error.
pub async fn verify<C: CredentialStore>(
    store: &C,
    username: &str,
    password: &str,
    grace: Duration,
) -> Result<Credential> {
    let Some(credential) = store.find_by_username(username).await? else {
        tracing::debug!(username = %username, "Login for unknown username");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&credential.password_hash, password) {
        tracing::info!(user_id = %credential.user_id, "Password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    check_status(&credential, Utc::now(), grace)?;
    Ok(credential)
}
