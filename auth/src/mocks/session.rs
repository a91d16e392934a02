//! Mock refresh session store for testing.

use crate::error::{AuthError, Result};
use crate::mocks::{lock, to_std};
use crate::providers::SessionStore;
use crate::state::UserId;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug, Default)]
struct Inner {
    by_user: HashMap<UserId, (String, Instant)>,
    by_token: HashMap<String, (UserId, Instant)>,
}

/// In-memory refresh session store.
///
/// Mirrors the Redis layout: a forward map and a reverse map with identical
/// expiry. Can be switched to an unavailable state to exercise downstream
/// failure handling.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    inner: Arc<Mutex<Inner>>,
    unavailable: Arc<AtomicBool>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `DownstreamUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The live refresh token of a user, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn active_token(&self, user_id: UserId) -> Result<Option<String>> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .by_user
            .get(&user_id)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(token, _)| token.clone()))
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::DownstreamUnavailable("mock session store offline".into()));
        }
        Ok(())
    }
}

impl SessionStore for MockSessionStore {
    async fn store(&self, user_id: UserId, token: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;
        let expires = Instant::now() + to_std(ttl);
        let mut inner = lock(&self.inner)?;
        inner.by_user.insert(user_id, (token.to_string(), expires));
        inner.by_token.insert(token.to_string(), (user_id, expires));
        Ok(())
    }

    async fn validate(&self, user_id: UserId, token: &str) -> Result<bool> {
        self.check_available()?;
        let inner = lock(&self.inner)?;
        Ok(inner
            .by_user
            .get(&user_id)
            .is_some_and(|(stored, expires)| stored == token && *expires > Instant::now()))
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        self.check_available()?;
        let mut inner = lock(&self.inner)?;
        if let Some((token, _)) = inner.by_user.remove(&user_id) {
            inner.by_token.remove(&token);
        }
        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> Result<()> {
        self.check_available()?;
        let mut inner = lock(&self.inner)?;
        let Some((user_id, _)) = inner.by_token.remove(token) else {
            return Ok(());
        };
        if inner.by_user.get(&user_id).is_some_and(|(stored, _)| stored == token) {
            inner.by_user.remove(&user_id);
        }
        Ok(())
    }
}
