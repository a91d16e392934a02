//! PostgreSQL device repository implementation.
//!
//! # Architecture
//!
//! - `user_devices`: one row per `(user_id, fingerprint)`, soft deleted via
//!   `deleted_at`. Upserts resurrect deleted rows.
//! - `device_verifications`: append-only challenge log. The newest unverified
//!   unexpired row for a `(user_id, fingerprint)` is the pending challenge.
//!
//! # Example
//!
//! ```no_run
//! use trustgate_auth::stores::PostgresDeviceRepository;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/auth").await?;
//! let repo = PostgresDeviceRepository::new(pool);
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::DeviceRepository;
use crate::state::{DeviceChallenge, DeviceId, DeviceRecord, DeviceUpsert, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const DEVICE_COLUMNS: &str = "id, user_id, fingerprint, trusted, device_name, device_type, \
                              last_ip, last_user_agent, last_login_at, created_at, updated_at";

const CHALLENGE_COLUMNS: &str = "id, user_id, fingerprint, verification_code, attempt_count, \
                                 ip_address, user_agent, is_verified, expires_at, verified_at, created_at";

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    fingerprint: String,
    trusted: bool,
    device_name: String,
    device_type: String,
    last_ip: String,
    last_user_agent: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeviceRow> for DeviceRecord {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: DeviceId(row.id),
            user_id: UserId(row.user_id),
            fingerprint: row.fingerprint,
            trusted: row.trusted,
            device_name: row.device_name,
            device_type: row.device_type,
            last_ip: row.last_ip,
            last_user_agent: row.last_user_agent,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    fingerprint: String,
    verification_code: String,
    attempt_count: i32,
    ip_address: String,
    user_agent: String,
    is_verified: bool,
    expires_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ChallengeRow> for DeviceChallenge {
    fn from(row: ChallengeRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId(row.user_id),
            fingerprint: row.fingerprint,
            code: row.verification_code,
            attempt_count: u32::try_from(row.attempt_count).unwrap_or(0),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            is_verified: row.is_verified,
            expires_at: row.expires_at,
            verified_at: row.verified_at,
            created_at: row.created_at,
        }
    }
}

/// `PostgreSQL` device repository.
///
/// Provides durable storage for the device registry and challenge log.
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresDeviceRepository {
    /// Create a new `PostgreSQL` device repository.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for PostgresDeviceRepository {
    async fn find_device(&self, user_id: UserId, fingerprint: &str) -> Result<Option<DeviceRecord>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM user_devices \
             WHERE user_id = $1 AND fingerprint = $2 AND deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, DeviceRow>(&sql)
            .bind(user_id.0)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get device: {e}")))?;

        Ok(row.map(DeviceRecord::from))
    }

    async fn upsert_device(&self, device: DeviceUpsert) -> Result<DeviceRecord> {
        // Trust is sticky on live rows; a resurrected row starts from the
        // requested trust. Blank name/type keep what is stored.
        let sql = format!(
            "INSERT INTO user_devices \
                 (user_id, fingerprint, trusted, device_name, device_type, \
                  last_ip, last_user_agent, last_login_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, fingerprint) DO UPDATE SET \
                 trusted = EXCLUDED.trusted \
                     OR (user_devices.trusted AND user_devices.deleted_at IS NULL), \
                 device_name = COALESCE(NULLIF(EXCLUDED.device_name, ''), user_devices.device_name), \
                 device_type = COALESCE(NULLIF(EXCLUDED.device_type, ''), user_devices.device_type), \
                 last_ip = EXCLUDED.last_ip, \
                 last_user_agent = EXCLUDED.last_user_agent, \
                 last_login_at = EXCLUDED.last_login_at, \
                 updated_at = NOW(), \
                 deleted_at = NULL \
             RETURNING {DEVICE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, DeviceRow>(&sql)
            .bind(device.user_id.0)
            .bind(&device.fingerprint)
            .bind(device.trusted)
            .bind(&device.device_name)
            .bind(&device.device_type)
            .bind(&device.ip)
            .bind(&device.user_agent)
            .bind(device.login_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to upsert device: {e}")))?;

        Ok(DeviceRecord::from(row))
    }

    async fn list_devices(&self, user_id: UserId) -> Result<Vec<DeviceRecord>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM user_devices \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY updated_at DESC"
        );

        let rows = sqlx::query_as::<_, DeviceRow>(&sql)
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to list devices: {e}")))?;

        Ok(rows.into_iter().map(DeviceRecord::from).collect())
    }

    async fn remove_device(&self, user_id: UserId, device_id: DeviceId) -> Result<()> {
        // Filter by both user_id and id so users can only remove their own devices
        let result = sqlx::query(
            "UPDATE user_devices SET deleted_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(device_id.0)
        .bind(user_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to remove device: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::ResourceNotFound);
        }
        Ok(())
    }

    async fn create_challenge(&self, challenge: &DeviceChallenge) -> Result<()> {
        sqlx::query(
            "INSERT INTO device_verifications \
                 (id, user_id, fingerprint, verification_code, attempt_count, \
                  ip_address, user_agent, is_verified, expires_at, verified_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(challenge.id)
        .bind(challenge.user_id.0)
        .bind(&challenge.fingerprint)
        .bind(&challenge.code)
        .bind(i32::try_from(challenge.attempt_count).unwrap_or(i32::MAX))
        .bind(&challenge.ip_address)
        .bind(&challenge.user_agent)
        .bind(challenge.is_verified)
        .bind(challenge.expires_at)
        .bind(challenge.verified_at)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to create challenge: {e}")))?;

        Ok(())
    }

    async fn latest_pending_challenge(
        &self,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeviceChallenge>> {
        let sql = format!(
            "SELECT {CHALLENGE_COLUMNS} FROM device_verifications \
             WHERE user_id = $1 AND fingerprint = $2 \
               AND NOT is_verified AND expires_at > $3 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );

        let row = sqlx::query_as::<_, ChallengeRow>(&sql)
            .bind(user_id.0)
            .bind(fingerprint)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get challenge: {e}")))?;

        Ok(row.map(DeviceChallenge::from))
    }

    async fn reserve_challenge_attempt(
        &self,
        challenge_id: uuid::Uuid,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>> {
        let count: Option<i32> = sqlx::query_scalar(
            "UPDATE device_verifications SET attempt_count = attempt_count + 1 \
             WHERE id = $1 AND NOT is_verified AND expires_at > $3 AND attempt_count < $2 \
             RETURNING attempt_count",
        )
        .bind(challenge_id)
        .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to reserve attempt: {e}")))?;

        Ok(count.map(|n| u32::try_from(n).unwrap_or_default()))
    }

    async fn mark_challenge_verified(
        &self,
        challenge_id: uuid::Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE device_verifications SET is_verified = TRUE, verified_at = $2 \
             WHERE id = $1 AND NOT is_verified",
        )
        .bind(challenge_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to verify challenge: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired_challenges(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM device_verifications WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to purge challenges: {e}")))?;

        Ok(result.rows_affected())
    }
}
