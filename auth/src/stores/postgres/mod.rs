//! PostgreSQL storage implementations.
//!
//! This module provides durable storage using PostgreSQL for:
//! - Credentials (`user_credentials`)
//! - Device registry (`user_devices`)
//! - Device challenges (`device_verifications`)
//!
//! Schema lives in `auth/migrations` and is applied with [`migrate`].

pub mod credential;
pub mod device;

use crate::error::{AuthError, Result};
use sqlx::PgPool;

// Re-exports
pub use credential::PostgresCredentialStore;
pub use device::PostgresDeviceRepository;

/// Run database migrations.
///
/// # Errors
///
/// Returns error if migrations fail.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Migration failed: {e}")))?;
    Ok(())
}
