//! Redis-based one-time verification code store.

use crate::constants::keys;
use crate::error::{AuthError, Result};
use crate::providers::VerificationCodeStore;
use crate::stores::{connect, ttl_millis};
use chrono::Duration;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// One-time codes keyed as `verification_code:{key}`.
#[derive(Clone)]
pub struct RedisVerificationCodeStore {
    conn_manager: ConnectionManager,
}

impl RedisVerificationCodeStore {
    /// Create a new Redis code store.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            conn_manager: connect(redis_url).await?,
        })
    }

    /// Create a code store over an existing connection manager.
    #[must_use]
    pub const fn from_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn key(key: &str) -> String {
        format!("{}{key}", keys::VERIFICATION_CODE)
    }
}

impl VerificationCodeStore for RedisVerificationCodeStore {
    async fn set(&self, key: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .pset_ex(Self::key(key), code, ttl_millis(ttl))
            .await
            .map_err(|e| AuthError::DownstreamUnavailable(format!("Failed to store code: {e}")))?;

        tracing::debug!(key = %key, "Stored verification code");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();

        conn.get(Self::key(key))
            .await
            .map_err(|e| AuthError::DownstreamUnavailable(format!("Failed to read code: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(Self::key(key))
            .await
            .map_err(|e| AuthError::DownstreamUnavailable(format!("Failed to delete code: {e}")))?;

        Ok(())
    }
}
