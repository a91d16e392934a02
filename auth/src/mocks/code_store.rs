//! Mock verification code store for testing.

use crate::error::Result;
use crate::mocks::{lock, to_std};
use crate::providers::VerificationCodeStore;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// In-memory one-time code store with TTL expiry.
#[derive(Debug, Clone, Default)]
pub struct MockVerificationCodeStore {
    codes: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MockVerificationCodeStore {
    /// Create a new mock code store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerificationCodeStore for MockVerificationCodeStore {
    async fn set(&self, key: &str, code: &str, ttl: Duration) -> Result<()> {
        lock(&self.codes)?.insert(key.to_string(), (code.to_string(), Instant::now() + to_std(ttl)));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut codes = lock(&self.codes)?;
        let live = codes
            .get(key)
            .filter(|(_, expires)| *expires > now)
            .map(|(code, _)| code.clone());
        if live.is_none() {
            codes.remove(key);
        }
        Ok(live)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        lock(&self.codes)?.remove(key);
        Ok(())
    }
}
