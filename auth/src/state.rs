//! Authentication domain types.
//!
//! Credentials, token claims, device records and the request/outcome types
//! that flow through [`crate::service::AuthService`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::token_types;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a device registry row.
///
/// Not to be confused with the client-computed fingerprint, which is the
/// natural key of a device within one user's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub uuid::Uuid);

impl DeviceId {
    /// Generate a new random `DeviceId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════════════════

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered, not yet activated.
    Inactive,
    /// Activated.
    Active,
    /// Banned by an administrator.
    Banned,
}

impl AccountStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Banned => "banned",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "banned" => Ok(Self::Banned),
            other => Err(format!("Unknown account status: {other}")),
        }
    }
}

/// Stored credential record.
///
/// `password_hash` is `salt:hash` (see [`crate::credentials`]). It is
/// skipped during serialization so a credential can never leak it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// User ID.
    pub user_id: UserId,

    /// Unique username.
    pub username: String,

    /// Unique email.
    pub email: String,

    /// Salted password digest.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Account status.
    pub status: AccountStatus,

    /// Last completed login. `None` means the account has never logged in.
    pub last_login_at: Option<DateTime<Utc>>,

    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// Whether this login is the account's first ever.
    #[must_use]
    pub const fn is_first_login(&self) -> bool {
        self.last_login_at.is_none()
    }
}

/// Data for a new credential row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    /// Unique username.
    pub username: String,

    /// Unique email.
    pub email: String,

    /// Salted password digest.
    pub password_hash: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════════════════

/// Token class carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token.
    Access,
    /// Long-lived refresh token.
    Refresh,
}

impl TokenType {
    /// Claim value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => token_types::ACCESS,
            Self::Refresh => token_types::REFRESH,
        }
    }
}

/// Claims carried in every signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject user.
    pub user_id: UserId,

    /// Username at issue time.
    pub username: String,

    /// Access or refresh.
    pub token_type: TokenType,

    /// Issued at (unix seconds).
    pub iat: i64,

    /// Not before (unix seconds).
    pub nbf: i64,

    /// Expires at (unix seconds).
    pub exp: i64,

    /// Issuer.
    pub iss: String,

    /// Unique token ID. Keeps tokens minted within the same second distinct.
    pub jti: String,
}

impl TokenClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,

    /// Long-lived refresh token.
    pub refresh_token: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Devices
// ═══════════════════════════════════════════════════════════════════════

/// Known device of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Row ID.
    pub id: DeviceId,

    /// Owner.
    pub user_id: UserId,

    /// Client-computed fingerprint, unique per user.
    pub fingerprint: String,

    /// Trusted devices skip the email challenge.
    pub trusted: bool,

    /// User supplied name.
    pub device_name: String,

    /// `mobile`, `desktop` or `tablet`.
    pub device_type: String,

    /// IP of the last login from this device.
    pub last_ip: String,

    /// User agent of the last login from this device.
    pub last_user_agent: String,

    /// Last login from this device.
    pub last_login_at: Option<DateTime<Utc>>,

    /// First seen.
    pub created_at: DateTime<Utc>,

    /// Last modified.
    pub updated_at: DateTime<Utc>,
}

/// Values written by a device upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUpsert {
    /// Owner.
    pub user_id: UserId,

    /// Client-computed fingerprint.
    pub fingerprint: String,

    /// Requested trust. Never downgrades an already trusted row.
    pub trusted: bool,

    /// Device name.
    pub device_name: String,

    /// Device type.
    pub device_type: String,

    /// Login IP.
    pub ip: String,

    /// Login user agent.
    pub user_agent: String,

    /// Login time.
    pub login_at: DateTime<Utc>,
}

/// Email challenge for an unrecognized device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChallenge {
    /// Row ID.
    pub id: uuid::Uuid,

    /// User being challenged.
    pub user_id: UserId,

    /// Fingerprint being challenged.
    pub fingerprint: String,

    /// Six digit code.
    #[serde(skip_serializing, default)]
    pub code: String,

    /// Wrong submissions so far.
    pub attempt_count: u32,

    /// IP the challenge was issued to.
    pub ip_address: String,

    /// User agent the challenge was issued to.
    pub user_agent: String,

    /// Consumed.
    pub is_verified: bool,

    /// Expiry.
    pub expires_at: DateTime<Utc>,

    /// When it was consumed.
    pub verified_at: Option<DateTime<Utc>>,

    /// Issue time.
    pub created_at: DateTime<Utc>,
}

impl DeviceChallenge {
    /// Whether the challenge can still be answered at `now`.
    #[must_use]
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        !self.is_verified && self.expires_at > now
    }
}

/// Device information presented with a login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Client-computed fingerprint.
    pub fingerprint: Option<String>,

    /// Optional device name.
    pub device_name: Option<String>,

    /// Optional device type.
    pub device_type: Option<String>,

    /// Client IP as seen by the server.
    pub ip: String,

    /// Client user agent.
    pub user_agent: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Requests & Outcomes
// ═══════════════════════════════════════════════════════════════════════

/// Password login request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,

    /// Plaintext password.
    pub password: String,

    /// Presented device.
    #[serde(default)]
    pub device: DeviceMeta,

    /// Response to a pending device challenge.
    #[serde(default)]
    pub device_verification_code: Option<String>,
}

/// Public view of an account returned with login outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID.
    pub user_id: UserId,

    /// Username.
    pub username: String,

    /// Email.
    pub email: String,

    /// Account status.
    pub status: AccountStatus,

    /// Previous login.
    pub last_login_at: Option<DateTime<Utc>>,

    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Credential> for UserSummary {
    fn from(c: &Credential) -> Self {
        Self {
            user_id: c.user_id,
            username: c.username.clone(),
            email: c.email.clone(),
            status: c.status,
            last_login_at: c.last_login_at,
            created_at: c.created_at,
        }
    }
}

/// Result of a password login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Tokens issued.
    Authenticated {
        /// Access token.
        access_token: String,
        /// Refresh token.
        refresh_token: String,
        /// Account.
        user: UserSummary,
    },

    /// A device code was emailed; resubmit the login with it.
    VerificationRequired {
        /// Account.
        user: UserSummary,
    },
}

impl LoginOutcome {
    /// Token pair, if authenticated.
    #[must_use]
    pub fn tokens(&self) -> Option<TokenPair> {
        match self {
            Self::Authenticated {
                access_token,
                refresh_token,
                ..
            } => Some(TokenPair {
                access_token: access_token.clone(),
                refresh_token: refresh_token.clone(),
            }),
            Self::VerificationRequired { .. } => None,
        }
    }

    /// Whether a device challenge was issued.
    #[must_use]
    pub const fn is_verification_required(&self) -> bool {
        matches!(self, Self::VerificationRequired { .. })
    }
}

/// Registration completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Username.
    pub username: String,

    /// Email the registration code was sent to.
    pub email: String,

    /// Plaintext password.
    pub password: String,

    /// Registration code.
    pub verification_code: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_id_generation() {
        let id1 = UserId::new();
        let id2 = UserId::new();

        assert_ne!(id1, id2);
    }

    #[test]
    fn test_user_id_parses_its_display() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_account_status_str() {
        for status in [
            AccountStatus::Inactive,
            AccountStatus::Active,
            AccountStatus::Banned,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_credential_never_serializes_hash() {
        let credential = Credential {
            user_id: UserId::new(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "salt:hash".into(),
            status: AccountStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&credential).unwrap();
        assert!(!json.contains("salt:hash"));
        assert!(credential.is_first_login());
    }

    #[test]
    fn test_challenge_pending_window() {
        let now = Utc::now();
        let mut challenge = DeviceChallenge {
            id: uuid::Uuid::new_v4(),
            user_id: UserId::new(),
            fingerprint: "fp".into(),
            code: "123456".into(),
            attempt_count: 0,
            ip_address: "127.0.0.1".into(),
            user_agent: "test".into(),
            is_verified: false,
            expires_at: now + Duration::minutes(5),
            verified_at: None,
            created_at: now,
        };

        assert!(challenge.is_pending(now));
        assert!(!challenge.is_pending(now + Duration::minutes(5)));

        challenge.is_verified = true;
        assert!(!challenge.is_pending(now));
    }

    #[test]
    fn test_token_type_claim_values() {
        assert_eq!(TokenType::Access.as_str(), "access");
        assert_eq!(
            serde_json::to_string(&TokenType::Refresh).unwrap(),
            "\"refresh\""
        );
    }
}
