//! Redis-based access token revocation list.

use crate::constants::keys;
use crate::error::{AuthError, Result};
use crate::providers::AccessRevocationList;
use crate::state::UserId;
use crate::stores::{connect, ttl_millis};
use chrono::Duration;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Revoked access tokens keyed as `blacklist:access_token:{token}`.
///
/// Each entry expires together with the token it revokes, so the list never
/// grows beyond the set of live revoked tokens.
#[derive(Clone)]
pub struct RedisAccessRevocationList {
    conn_manager: ConnectionManager,
}

impl RedisAccessRevocationList {
    /// Create a new Redis revocation list.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            conn_manager: connect(redis_url).await?,
        })
    }

    /// Create a revocation list over an existing connection manager.
    #[must_use]
    pub const fn from_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn key(token: &str) -> String {
        format!("{}{token}", keys::REVOKED_ACCESS_TOKEN)
    }
}

impl AccessRevocationList for RedisAccessRevocationList {
    async fn add(&self, user_id: UserId, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let ttl_ms = ttl_millis(ttl);

        let _: () = conn
            .pset_ex(Self::key(token), user_id.to_string(), ttl_ms)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Failed to revoke access token");
                AuthError::DownstreamUnavailable(format!("Failed to revoke access token: {e}"))
            })?;

        tracing::info!(user_id = %user_id, ttl_ms, "Revoked access token");
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        conn.exists(Self::key(token)).await.map_err(|e| {
            AuthError::DownstreamUnavailable(format!("Failed to check revocation list: {e}"))
        })
    }
}
