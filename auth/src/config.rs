//! Authentication configuration.
//!
//! Configuration values are provided by the application and injected into
//! [`crate::tokens::TokenService`] and [`crate::service::AuthService`] at
//! construction. Nothing here is global or mutable after startup.

use chrono::Duration;
use thiserror::Error;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration loading errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is not set.
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Environment variable could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: String,
        /// Raw value
        value: String,
    },

    /// Configuration is structurally invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Token signing and lifetime configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret shared by every token this process issues or validates.
    pub secret: Vec<u8>,

    /// `iss` claim written into every token.
    pub issuer: String,

    /// Access token lifetime.
    ///
    /// Default: 15 minutes
    pub access_ttl: Duration,

    /// Refresh token lifetime, also the session TTL.
    ///
    /// Default: 7 days
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Create token configuration with default lifetimes.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "trustgate".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Set issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Validate secret length and lifetimes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the secret is too short or a
    /// lifetime is not positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.access_ttl <= Duration::zero() || self.refresh_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid("token lifetimes must be positive".into()));
        }
        if self.access_ttl >= self.refresh_ttl {
            return Err(ConfigError::Invalid(
                "access token lifetime must be shorter than refresh token lifetime".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Authentication core configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token configuration.
    pub token: TokenConfig,

    /// How long an unactivated account may still log in after registration.
    ///
    /// Default: 24 hours
    pub activation_grace_period: Duration,

    /// Lifetime of registration / reset / activation codes.
    ///
    /// Default: 5 minutes
    pub verification_code_ttl: Duration,

    /// Lifetime of a device verification challenge.
    ///
    /// Default: 5 minutes
    pub device_challenge_ttl: Duration,

    /// Wrong submissions allowed per device challenge.
    ///
    /// Default: 5
    pub max_device_challenge_attempts: u32,

    /// Code-issuing requests allowed per client IP per rate-limit window.
    ///
    /// Default: 10
    pub max_requests_per_ip_per_day: u32,
}

impl AuthConfig {
    /// Create configuration with default policy values.
    #[must_use]
    pub const fn new(token: TokenConfig) -> Self {
        Self {
            token,
            activation_grace_period: Duration::hours(24),
            verification_code_ttl: Duration::minutes(5),
            device_challenge_ttl: Duration::minutes(5),
            max_device_challenge_attempts: 5,
            max_requests_per_ip_per_day: 10,
        }
    }

    /// Set activation grace period.
    #[must_use]
    pub const fn with_activation_grace_period(mut self, period: Duration) -> Self {
        self.activation_grace_period = period;
        self
    }

    /// Set verification code lifetime.
    #[must_use]
    pub const fn with_verification_code_ttl(mut self, ttl: Duration) -> Self {
        self.verification_code_ttl = ttl;
        self
    }

    /// Set device challenge lifetime.
    #[must_use]
    pub const fn with_device_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.device_challenge_ttl = ttl;
        self
    }

    /// Set maximum wrong device challenge submissions.
    #[must_use]
    pub const fn with_max_device_challenge_attempts(mut self, attempts: u32) -> Self {
        self.max_device_challenge_attempts = attempts;
        self
    }

    /// Set daily per-IP request budget for code issuance.
    #[must_use]
    pub const fn with_max_requests_per_ip_per_day(mut self, max: u32) -> Self {
        self.max_requests_per_ip_per_day = max;
        self
    }

    /// Load configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `JWT_SECRET` | required |
    /// | `JWT_ACCESS_TOKEN_EXPIRES_IN_MINUTES` | 15 |
    /// | `JWT_REFRESH_TOKEN_EXPIRES_IN_DAYS` | 7 |
    /// | `MAX_IP_REQUESTS_PER_DAY` | 10 |
    ///
    /// # Errors
    ///
    /// Returns error if `JWT_SECRET` is missing, a number fails to parse,
    /// or the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AuthConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotSet("JWT_SECRET".to_string()))?;

        let access_minutes = parse_or(&lookup, "JWT_ACCESS_TOKEN_EXPIRES_IN_MINUTES", 15)?;
        let refresh_days = parse_or(&lookup, "JWT_REFRESH_TOKEN_EXPIRES_IN_DAYS", 7)?;
        let max_requests = parse_or(&lookup, "MAX_IP_REQUESTS_PER_DAY", 10)?;

        let token = TokenConfig::new(secret)
            .with_access_ttl(Duration::minutes(access_minutes))
            .with_refresh_ttl(Duration::days(refresh_days));
        token.validate()?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_requests = max_requests.clamp(1, i64::from(u32::MAX)) as u32;

        Ok(Self::new(token).with_max_requests_per_ip_per_day(max_requests))
    }
}

fn parse_or<F>(lookup: &F, name: &str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_token_config_builder() {
        let config = TokenConfig::new(SECRET)
            .with_issuer("tests")
            .with_access_ttl(Duration::minutes(5))
            .with_refresh_ttl(Duration::days(1));

        assert_eq!(config.issuer, "tests");
        assert_eq!(config.access_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_ttl, Duration::days(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_config_rejects_short_secret() {
        let config = TokenConfig::new("short");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", TokenConfig::new(SECRET));
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::new(TokenConfig::new(SECRET));
        assert_eq!(config.activation_grace_period, Duration::hours(24));
        assert_eq!(config.verification_code_ttl, Duration::minutes(5));
        assert_eq!(config.device_challenge_ttl, Duration::minutes(5));
        assert_eq!(config.max_device_challenge_attempts, 5);
        assert_eq!(config.max_requests_per_ip_per_day, 10);
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", SECRET),
            ("JWT_ACCESS_TOKEN_EXPIRES_IN_MINUTES", "30"),
            ("JWT_REFRESH_TOKEN_EXPIRES_IN_DAYS", "14"),
            ("MAX_IP_REQUESTS_PER_DAY", "3"),
        ]);

        let config = AuthConfig::from_lookup(|k| vars.get(k).map(ToString::to_string))
            .expect("config should load");

        assert_eq!(config.token.access_ttl, Duration::minutes(30));
        assert_eq!(config.token.refresh_ttl, Duration::days(14));
        assert_eq!(config.max_requests_per_ip_per_day, 3);
    }

    #[test]
    fn test_from_lookup_requires_secret() {
        let result = AuthConfig::from_lookup(|_| None);
        assert_eq!(
            result.err(),
            Some(ConfigError::EnvVarNotSet("JWT_SECRET".to_string()))
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage_numbers() {
        let result = AuthConfig::from_lookup(|k| match k {
            "JWT_SECRET" => Some(SECRET.to_string()),
            "MAX_IP_REQUESTS_PER_DAY" => Some("lots".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
