//! Mock credential store for testing.

use crate::credentials::make_password_hash;
use crate::error::{AuthError, Result};
use crate::mocks::lock;
use crate::providers::CredentialStore;
use crate::state::{AccountStatus, Credential, NewCredential, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory credential store.
///
/// Enforces username and email uniqueness like the database constraints do.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialStore {
    credentials: Arc<Mutex<HashMap<UserId, Credential>>>,
    fail_record_login: Arc<AtomicBool>,
}

impl MockCredentialStore {
    /// Create a new, empty mock credential store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a credential as-is, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn insert(&self, credential: Credential) -> Result<()> {
        lock(&self.credentials)?.insert(credential.user_id, credential);
        Ok(())
    }

    /// Insert a user with a freshly hashed password.
    ///
    /// The account is created now and has never logged in.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        status: AccountStatus,
    ) -> Result<Credential> {
        let credential = Credential {
            user_id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: make_password_hash(password),
            status,
            last_login_at: None,
            created_at: Utc::now(),
        };
        self.insert(credential.clone())?;
        Ok(credential)
    }

    /// Make `record_login` fail with a database error.
    pub fn set_fail_record_login(&self, fail: bool) {
        self.fail_record_login.store(fail, Ordering::SeqCst);
    }

    /// Current copy of a stored credential.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn get(&self, user_id: UserId) -> Result<Option<Credential>> {
        Ok(lock(&self.credentials)?.get(&user_id).cloned())
    }

    fn find_by<P>(&self, predicate: P) -> Result<Option<Credential>>
    where
        P: Fn(&Credential) -> bool,
    {
        Ok(lock(&self.credentials)?
            .values()
            .find(|c| predicate(c))
            .cloned())
    }

    fn update<F>(&self, user_id: UserId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Credential),
    {
        let mut credentials = lock(&self.credentials)?;
        let credential = credentials
            .get_mut(&user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        apply(credential);
        Ok(())
    }
}

impl CredentialStore for MockCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        self.find_by(|c| c.username == username)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        self.find_by(|c| c.email == email)
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Credential>> {
        self.get(user_id)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.find_by(|c| c.username == username)?.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_by(|c| c.email == email)?.is_some())
    }

    async fn create_credential(&self, new: NewCredential) -> Result<Credential> {
        let mut credentials = lock(&self.credentials)?;
        if credentials.values().any(|c| c.username == new.username) {
            return Err(AuthError::UsernameTaken);
        }
        if credentials.values().any(|c| c.email == new.email) {
            return Err(AuthError::EmailTaken);
        }

        let credential = Credential {
            user_id: UserId::new(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            status: AccountStatus::Inactive,
            last_login_at: None,
            created_at: Utc::now(),
        };
        credentials.insert(credential.user_id, credential.clone());
        Ok(credential)
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        self.update(user_id, |c| c.password_hash = password_hash.to_string())
    }

    async fn update_status(&self, user_id: UserId, status: AccountStatus) -> Result<()> {
        self.update(user_id, |c| c.status = status)
    }

    async fn record_login(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
        if self.fail_record_login.load(Ordering::SeqCst) {
            return Err(AuthError::DatabaseError("record_login failed".into()));
        }
        self.update(user_id, |c| c.last_login_at = Some(at))
    }
}
