//! PostgreSQL credential store implementation.
//!
//! # Example
//!
//! ```no_run
//! use trustgate_auth::stores::PostgresCredentialStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/auth").await?;
//! let store = PostgresCredentialStore::new(pool);
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::CredentialStore;
use crate::state::{AccountStatus, Credential, NewCredential, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const COLUMNS: &str = "user_id, username, email, password_hash, status, last_login_at, created_at";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: uuid::Uuid,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AuthError;

    fn try_from(row: CredentialRow) -> Result<Self> {
        Ok(Self {
            user_id: UserId(row.user_id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            status: row.status.parse().map_err(AuthError::DatabaseError)?,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` credential store.
#[derive(Clone)]
pub struct PostgresCredentialStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Create a new `PostgreSQL` credential store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Credential>> {
        let sql = format!("SELECT {COLUMNS} FROM user_credentials WHERE {column} = $1");

        sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to load credential: {e}")))?
            .map(Credential::try_from)
            .transpose()
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM user_credentials WHERE {column} = $1)");

        sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to check {column}: {e}")))
    }
}

fn map_unique_violation(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some("user_credentials_username_key") => return AuthError::UsernameTaken,
            Some("user_credentials_email_key") => return AuthError::EmailTaken,
            _ => {}
        }
    }
    AuthError::DatabaseError(format!("Failed to create credential: {e}"))
}

impl CredentialStore for PostgresCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        self.find_one("email", email).await
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Credential>> {
        let sql = format!("SELECT {COLUMNS} FROM user_credentials WHERE user_id = $1");

        sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to load credential: {e}")))?
            .map(Credential::try_from)
            .transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.exists("username", username).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.exists("email", email).await
    }

    async fn create_credential(&self, credential: NewCredential) -> Result<Credential> {
        let sql = format!(
            "INSERT INTO user_credentials (username, email, password_hash, status) \
             VALUES ($1, $2, $3, 'inactive') \
             RETURNING {COLUMNS}"
        );

        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(&credential.username)
            .bind(&credential.email)
            .bind(&credential.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        let created = Credential::try_from(row)?;
        tracing::info!(user_id = %created.user_id, "Created credential");
        Ok(created)
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_credentials SET password_hash = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id.0)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to update password: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::ResourceNotFound);
        }
        Ok(())
    }

    async fn update_status(&self, user_id: UserId, status: AccountStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_credentials SET status = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id.0)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to update status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::ResourceNotFound);
        }
        tracing::info!(user_id = %user_id, status = status.as_str(), "Updated account status");
        Ok(())
    }

    async fn record_login(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE user_credentials SET last_login_at = $2 WHERE user_id = $1")
            .bind(user_id.0)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to record login: {e}")))?;
        Ok(())
    }
}
