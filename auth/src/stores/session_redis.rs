//! Redis-based refresh session store.
//!
//! # Architecture
//!
//! - **Forward key**: `refresh_token:user:{user_id}` → refresh token
//! - **Reverse key**: `refresh_token:token:{token}` → user id
//! - **TTL**: refresh token lifetime, identical on both keys
//!
//! Storing a new token overwrites the forward key. The old reverse key is left
//! to expire on its own; it no longer validates because validation compares
//! against the forward key.
//!
//! # Example
//!
//! ```no_run
//! use trustgate_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::keys;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::UserId;
use crate::stores::{connect, ttl_millis};
use chrono::Duration;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Deletes the user's forward key and the reverse key of the token it held.
const DELETE_BY_USER: &str = r"
    local token = redis.call('GET', KEYS[1])
    redis.call('DEL', KEYS[1])
    if token then
        redis.call('DEL', ARGV[1] .. token)
    end
    return token and 1 or 0
";

/// Deletes a token's reverse key, and the forward key only if it still holds
/// that token, so a stale token cannot end a newer session.
const DELETE_BY_TOKEN: &str = r"
    local user_id = redis.call('GET', KEYS[1])
    if not user_id then
        return 0
    end
    redis.call('DEL', KEYS[1])
    local forward = ARGV[1] .. user_id
    if redis.call('GET', forward) == ARGV[2] then
        redis.call('DEL', forward)
    end
    return 1
";

/// Redis-based refresh session store.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            conn_manager: connect(redis_url).await?,
        })
    }

    /// Create a store over an existing connection manager.
    #[must_use]
    pub const fn from_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    fn forward_key(user_id: UserId) -> String {
        format!("{}{}", keys::REFRESH_BY_USER, user_id)
    }

    fn reverse_key(token: &str) -> String {
        format!("{}{token}", keys::REFRESH_BY_TOKEN)
    }
}

impl SessionStore for RedisSessionStore {
    async fn store(&self, user_id: UserId, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let ttl_ms = ttl_millis(ttl);

        let _: () = redis::pipe()
            .atomic()
            .pset_ex(Self::forward_key(user_id), token, ttl_ms)
            .ignore()
            .pset_ex(Self::reverse_key(token), user_id.to_string(), ttl_ms)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Failed to store refresh session");
                AuthError::DownstreamUnavailable(format!("Failed to store refresh session: {e}"))
            })?;

        tracing::info!(user_id = %user_id, ttl_ms, "Stored refresh session");
        Ok(())
    }

    async fn validate(&self, user_id: UserId, token: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let stored: Option<String> = conn.get(Self::forward_key(user_id)).await.map_err(|e| {
            AuthError::DownstreamUnavailable(format!("Failed to read refresh session: {e}"))
        })?;

        Ok(stored.is_some_and(|s| constant_time_eq::constant_time_eq(s.as_bytes(), token.as_bytes())))
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = redis::Script::new(DELETE_BY_USER)
            .key(Self::forward_key(user_id))
            .arg(keys::REFRESH_BY_TOKEN)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AuthError::DownstreamUnavailable(format!("Failed to delete refresh session: {e}"))
            })?;

        tracing::info!(user_id = %user_id, existed = deleted == 1, "Deleted refresh session");
        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = redis::Script::new(DELETE_BY_TOKEN)
            .key(Self::reverse_key(token))
            .arg(keys::REFRESH_BY_USER)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AuthError::DownstreamUnavailable(format!("Failed to delete refresh session: {e}"))
            })?;

        if deleted == 0 {
            tracing::debug!("Refresh token had no session to delete");
        } else {
            tracing::info!("Deleted refresh session by token");
        }
        Ok(())
    }
}
