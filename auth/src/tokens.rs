//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs. They are stateless: validation needs only the
//! shared secret and the clock. Whether a refresh token is still the user's
//! active session, or whether an access token was revoked, is answered by
//! [`crate::providers::SessionStore`] and
//! [`crate::providers::AccessRevocationList`].

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::config::TokenConfig;
use crate::error::{AuthError, Result};
use crate::state::{TokenClaims, TokenPair, TokenType, UserId};

/// Issues and validates access/refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expired_ok: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Create a token service from configuration.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);

        let mut expired_ok = validation.clone();
        expired_ok.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            expired_ok,
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Access token lifetime.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime, also the session TTL.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token and a refresh token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if signing fails.
    pub fn issue_pair(&self, user_id: UserId, username: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_single(user_id, username, TokenType::Access, self.access_ttl)?,
            refresh_token: self.issue_single(
                user_id,
                username,
                TokenType::Refresh,
                self.refresh_ttl,
            )?,
        })
    }

    /// Issue a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if signing fails.
    pub fn issue_access(&self, user_id: UserId, username: &str) -> Result<String> {
        self.issue_single(user_id, username, TokenType::Access, self.access_ttl)
    }

    /// Issue one token of the given type and lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InternalError`] if signing fails.
    pub fn issue_single(
        &self,
        user_id: UserId,
        username: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            token_type,
            iat: now,
            nbf: now,
            exp: now + ttl.num_seconds(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign token: {e}")))
    }

    /// Verify signature, algorithm, issuer and validity window.
    ///
    /// The token type is not checked; see [`TokenService::expect_type`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for any verification failure.
    pub fn validate(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthError::InvalidToken
            })
    }

    /// Like [`TokenService::validate`] but accepts tokens past `exp`.
    ///
    /// Used where an expired token still proves who is asking, such as
    /// logging out with a stale access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for a bad signature, issuer or
    /// `nbf`.
    pub fn validate_allow_expired(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.expired_ok)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthError::InvalidToken
            })
    }

    /// Validate a token and require a specific type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::WrongTokenType`].
    pub fn expect_type(&self, token: &str, expected: TokenType) -> Result<TokenClaims> {
        let claims = self.validate(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Time left until the token expires.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token does not validate or
    /// has no lifetime left.
    pub fn remaining_ttl(&self, token: &str) -> Result<Duration> {
        let claims = self.validate(token)?;
        let expires_at = claims.expires_at().ok_or(AuthError::InvalidToken)?;
        let remaining = expires_at - Utc::now();

        if remaining <= Duration::zero() {
            return Err(AuthError::InvalidToken);
        }
        Ok(remaining)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes!!";

    fn service() -> TokenService {
        TokenService::new(&TokenConfig::new(SECRET))
    }

    #[test]
    fn test_issue_pair_carries_types() {
        let tokens = service();
        let user_id = UserId::new();
        let pair = tokens.issue_pair(user_id, "alice").unwrap();

        let access = tokens.validate(&pair.access_token).unwrap();
        let refresh = tokens.validate(&pair.refresh_token).unwrap();

        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(access.user_id, user_id);
        assert_eq!(refresh.username, "alice");
        assert_eq!(access.exp - access.iat, 15 * 60);
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_tokens_minted_together_are_distinct() {
        let tokens = service();
        let user_id = UserId::new();
        let a = tokens.issue_access(user_id, "alice").unwrap();
        let b = tokens.issue_access(user_id, "alice").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = service().issue_access(UserId::new(), "alice").unwrap();
        let other = TokenService::new(&TokenConfig::new("another-secret-that-is-32-bytes-long"));
        assert_eq!(other.validate(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let token = service().issue_access(UserId::new(), "alice").unwrap();
        let other = TokenService::new(&TokenConfig::new(SECRET).with_issuer("someone-else"));
        assert_eq!(other.validate(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let tokens = service();
        let token = tokens
            .issue_single(UserId::new(), "alice", TokenType::Access, Duration::seconds(-5))
            .unwrap();

        assert_eq!(tokens.validate(&token), Err(AuthError::InvalidToken));
        assert_eq!(tokens.remaining_ttl(&token), Err(AuthError::InvalidToken));
        assert!(tokens.validate_allow_expired(&token).is_ok());
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(service().validate("not-a-jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expect_type() {
        let tokens = service();
        let pair = tokens.issue_pair(UserId::new(), "alice").unwrap();

        assert!(tokens.expect_type(&pair.access_token, TokenType::Access).is_ok());
        assert_eq!(
            tokens.expect_type(&pair.refresh_token, TokenType::Access),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn test_remaining_ttl_tracks_exp() {
        let tokens = service();
        let token = tokens
            .issue_single(UserId::new(), "alice", TokenType::Access, Duration::seconds(120))
            .unwrap();

        let remaining = tokens.remaining_ttl(&token).unwrap();
        assert!(remaining <= Duration::seconds(120));
        assert!(remaining > Duration::seconds(117));
    }
}
