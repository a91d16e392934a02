//! Mock access token revocation list for testing.

use crate::error::Result;
use crate::mocks::{lock, to_std};
use crate::providers::AccessRevocationList;
use crate::state::UserId;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    user_id: UserId,
    ttl: Duration,
    expires: Instant,
}

/// In-memory revocation list.
///
/// Remembers the TTL each token was revoked with so tests can check it.
#[derive(Debug, Clone, Default)]
pub struct MockAccessRevocationList {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MockAccessRevocationList {
    /// Create a new mock revocation list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL `token` was revoked with, if it was.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn ttl_of(&self, token: &str) -> Result<Option<Duration>> {
        Ok(lock(&self.entries)?.get(token).map(|e| e.ttl))
    }

    /// User `token` was revoked for, if it was.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn owner_of(&self, token: &str) -> Result<Option<UserId>> {
        Ok(lock(&self.entries)?.get(token).map(|e| e.user_id))
    }

    /// Number of revocations recorded, expired or not.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.entries)?.len())
    }

    /// Whether nothing has been revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl AccessRevocationList for MockAccessRevocationList {
    async fn add(&self, user_id: UserId, token: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            user_id,
            ttl,
            expires: Instant::now() + to_std(ttl),
        };
        lock(&self.entries)?.insert(token.to_string(), entry);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        Ok(lock(&self.entries)?
            .get(token)
            .is_some_and(|e| e.expires > Instant::now()))
    }
}
