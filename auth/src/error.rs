//! Error types for authentication and session operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the authentication core.
///
/// Variants are grouped by the layer that produces them. Handlers map the
/// credential, token and device groups to client errors and everything in the
/// system group to a generic server error (see [`AuthError::is_server_error`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Credential Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown username or wrong password.
    ///
    /// Both cases collapse into this single variant so callers cannot
    /// enumerate usernames.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Account is banned.
    #[error("Account is banned")]
    AccountBanned,

    /// Account has not been activated and the grace window has passed.
    #[error("Account is not activated")]
    AccountInactive,

    /// Account is already active (activation requested twice).
    #[error("Account is already active")]
    AccountAlreadyActive,

    /// Username is already registered.
    #[error("Username is already taken")]
    UsernameTaken,

    /// Email is already registered.
    #[error("Email is already registered")]
    EmailTaken,

    /// Email address is malformed.
    #[error("Invalid email address")]
    InvalidEmail,

    // ═══════════════════════════════════════════════════════════
    // Token & Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Token is malformed, has a bad signature or is outside its validity window.
    #[error("Invalid token")]
    InvalidToken,

    /// Token is valid but of the wrong class (access vs refresh).
    #[error("Wrong token type")]
    WrongTokenType,

    /// Access token was revoked before its natural expiry.
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Access and refresh token were issued to different users.
    #[error("Access token and refresh token belong to different users")]
    TokenOwnerMismatch,

    /// Refresh token is not the active session for its user.
    #[error("Session not found")]
    SessionNotFound,

    // ═══════════════════════════════════════════════════════════
    // Device Verification & One-Time Codes
    // ═══════════════════════════════════════════════════════════

    /// A non-bootstrap login did not present a device fingerprint.
    #[error("Device fingerprint is required")]
    DeviceFingerprintRequired,

    /// No pending device challenge (missing, already used or expired).
    #[error("Device verification code has expired, request a new one")]
    DeviceChallengeExpired,

    /// Pending device challenge has used up its attempts.
    #[error("Too many wrong device verification attempts, request a new code")]
    DeviceChallengeAttemptsExceeded,

    /// Submitted code does not match.
    #[error("Wrong verification code")]
    WrongVerificationCode,

    /// Email verification code is missing or expired.
    #[error("Verification code has expired or does not exist")]
    VerificationCodeExpired,

    /// Too many code requests from this scope.
    #[error("Too many requests, please retry after {retry_after:?}")]
    RateLimited {
        /// Duration to wait before retrying
        retry_after: std::time::Duration,
    },

    /// Requested resource not found.
    #[error("Resource not found")]
    ResourceNotFound,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Cache or key-value store is unreachable or returned an error.
    #[error("Downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Email delivery failed.
    #[error("Failed to send email: {0}")]
    EmailDeliveryFailed(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use trustgate_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::InternalError("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::InvalidToken
                | Self::WrongTokenType
                | Self::TokenOwnerMismatch
                | Self::WrongVerificationCode
                | Self::VerificationCodeExpired
                | Self::DeviceChallengeExpired
                | Self::DeviceFingerprintRequired
                | Self::UsernameTaken
                | Self::EmailTaken
                | Self::InvalidEmail
        )
    }

    /// Returns `true` if this error indicates a security issue worth alerting on.
    ///
    /// # Examples
    ///
    /// ```
    /// # use trustgate_auth::AuthError;
    /// assert!(AuthError::DeviceChallengeAttemptsExceeded.is_security_issue());
    /// assert!(!AuthError::SessionNotFound.is_security_issue());
    /// ```
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::TokenRevoked
                | Self::TokenOwnerMismatch
                | Self::DeviceChallengeAttemptsExceeded
                | Self::RateLimited { .. }
        )
    }

    /// Returns `true` for failures of a collaborator (store, database, mail).
    ///
    /// These are surfaced to clients as a generic server error.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::DownstreamUnavailable(_)
                | Self::DatabaseError(_)
                | Self::EmailDeliveryFailed(_)
                | Self::InternalError(_)
        )
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        Self::DownstreamUnavailable(err.to_string())
    }
}
