//! Authentication orchestrator.
//!
//! [`AuthService`] sequences the credential check, device trust, token
//! issuance and session bookkeeping for every externally visible operation.
//! It holds no mutable state of its own; everything lives behind the
//! providers in [`AuthEnvironment`].

use chrono::Utc;
use constant_time_eq::constant_time_eq;
use std::time::Duration as StdDuration;

use crate::config::AuthConfig;
use crate::constants::{CODE_LENGTH, RATE_LIMIT_WINDOW_SECS, code_keys, scopes};
use crate::credentials::{self, make_password_hash};
use crate::device_trust::{DeviceDecision, DeviceTrustEngine};
use crate::environment::AuthEnvironment;
use crate::error::{AuthError, Result};
use crate::providers::{
    AccessRevocationList, CredentialStore, DeviceRepository, MailDispatcher, RateLimiter,
    SessionStore, VerificationCodeStore,
};
use crate::state::{
    AccountStatus, Credential, DeviceId, DeviceRecord, LoginOutcome, LoginRequest, NewCredential,
    RegisterRequest, TokenClaims, TokenType, UserId, UserSummary,
};
use crate::tokens::TokenService;
use crate::utils::{generate_numeric_code, is_valid_email};

/// Authentication service.
///
/// Generic over the same providers as [`AuthEnvironment`]. Cloning is cheap
/// when the providers are (connection managers, pools and mocks all are).
#[derive(Debug, Clone)]
pub struct AuthService<C, D, S, R, V, L, M>
where
    C: CredentialStore + Clone,
    D: DeviceRepository + Clone,
    S: SessionStore + Clone,
    R: AccessRevocationList + Clone,
    V: VerificationCodeStore + Clone,
    L: RateLimiter + Clone,
    M: MailDispatcher + Clone + 'static,
{
    env: AuthEnvironment<C, D, S, R, V, L, M>,
    tokens: TokenService,
    device_trust: DeviceTrustEngine<D, M>,
    config: AuthConfig,
}

impl<C, D, S, R, V, L, M> AuthService<C, D, S, R, V, L, M>
where
    C: CredentialStore + Clone,
    D: DeviceRepository + Clone,
    S: SessionStore + Clone,
    R: AccessRevocationList + Clone,
    V: VerificationCodeStore + Clone,
    L: RateLimiter + Clone,
    M: MailDispatcher + Clone + 'static,
{
    /// Create a service over `env` with `config`.
    #[must_use]
    pub fn new(env: AuthEnvironment<C, D, S, R, V, L, M>, config: AuthConfig) -> Self {
        let tokens = TokenService::new(&config.token);
        let device_trust = DeviceTrustEngine::new(env.devices.clone(), env.mail.clone(), &config);
        Self {
            env,
            tokens,
            device_trust,
            config,
        }
    }

    /// Providers this service runs against.
    #[must_use]
    pub const fn environment(&self) -> &AuthEnvironment<C, D, S, R, V, L, M> {
        &self.env
    }

    /// Token issuer and validator.
    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════
    // Login & Sessions
    // ═══════════════════════════════════════════════════════════

    /// Password login with device step-up.
    ///
    /// Returns [`LoginOutcome::VerificationRequired`] when a code was mailed
    /// for an unrecognised device. The client resubmits the same request
    /// with `device_verification_code` set.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`], [`AuthError::AccountBanned`],
    ///   [`AuthError::AccountInactive`]
    /// - device errors from [`DeviceTrustEngine::evaluate`]
    /// - store and mail errors
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let credential = credentials::verify(
            &self.env.credentials,
            &request.username,
            &request.password,
            self.config.activation_grace_period,
        )
        .await?;

        let decision = self
            .device_trust
            .evaluate(
                &credential,
                &request.device,
                request.device_verification_code.as_deref(),
            )
            .await?;

        match decision {
            DeviceDecision::VerificationRequired => Ok(LoginOutcome::VerificationRequired {
                user: UserSummary::from(&credential),
            }),
            DeviceDecision::Proceed => self.issue_token_pair(credential).await,
        }
    }

    async fn issue_token_pair(&self, mut credential: Credential) -> Result<LoginOutcome> {
        // Recorded before tokens exist: a null `last_login_at` skips device checks.
        let now = Utc::now();
        self.env
            .credentials
            .record_login(credential.user_id, now)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %credential.user_id, error = %e, "Failed to record login time");
            })?;
        credential.last_login_at = Some(now);

        let pair = self
            .tokens
            .issue_pair(credential.user_id, &credential.username)?;

        self.env
            .sessions
            .store(credential.user_id, &pair.refresh_token, self.tokens.refresh_ttl())
            .await?;

        tracing::info!(user_id = %credential.user_id, "Login succeeded, session stored");

        Ok(LoginOutcome::Authenticated {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserSummary::from(&credential),
        })
    }

    /// Exchange a live refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] / [`AuthError::WrongTokenType`]
    /// - [`AuthError::SessionNotFound`] if the token is not the user's
    ///   current session
    /// - [`AuthError::AccountBanned`] (the session is also deleted) or
    ///   [`AuthError::AccountInactive`]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<String> {
        let claims = self.tokens.expect_type(refresh_token, TokenType::Refresh)?;

        if !self.env.sessions.validate(claims.user_id, refresh_token).await? {
            tracing::info!(user_id = %claims.user_id, "Refresh with stale or revoked session");
            return Err(AuthError::SessionNotFound);
        }

        let credential = self
            .env
            .credentials
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match credential.status {
            AccountStatus::Active => {}
            AccountStatus::Banned => {
                if let Err(e) = self.env.sessions.delete(credential.user_id).await {
                    tracing::error!(user_id = %credential.user_id, error = %e, "Failed to drop banned user's session");
                }
                tracing::warn!(user_id = %credential.user_id, "Refresh by banned account");
                return Err(AuthError::AccountBanned);
            }
            AccountStatus::Inactive => return Err(AuthError::AccountInactive),
        }

        self.tokens.issue_access(credential.user_id, &credential.username)
    }

    /// End a session.
    ///
    /// The access token is revoked for the rest of its lifetime and the
    /// refresh session is deleted. An access token that has already expired
    /// needs no revocation.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] / [`AuthError::WrongTokenType`] for
    ///   either token
    /// - [`AuthError::TokenOwnerMismatch`] if the tokens belong to different
    ///   users
    /// - store errors
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let refresh = self.tokens.expect_type(refresh_token, TokenType::Refresh)?;

        let access = self.tokens.validate_allow_expired(access_token)?;
        if access.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }

        if access.user_id != refresh.user_id {
            tracing::warn!(
                access_user = %access.user_id,
                refresh_user = %refresh.user_id,
                "Logout with tokens of different users"
            );
            return Err(AuthError::TokenOwnerMismatch);
        }

        match self.tokens.remaining_ttl(access_token) {
            Ok(ttl) => {
                self.env
                    .revocations
                    .add(access.user_id, access_token, ttl)
                    .await?;
                tracing::info!(user_id = %access.user_id, ttl_secs = ttl.num_seconds(), "Access token revoked");
            }
            Err(_) => {
                tracing::debug!(user_id = %access.user_id, "Access token already expired, not revoking");
            }
        }

        self.env.sessions.delete_by_token(refresh_token).await?;
        tracing::info!(user_id = %refresh.user_id, "Logged out");
        Ok(())
    }

    /// Drop a user's refresh session, forcing a new login once the current
    /// access token expires.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn revoke_sessions(&self, user_id: UserId) -> Result<()> {
        self.env.sessions.delete(user_id).await?;
        tracing::info!(user_id = %user_id, "Sessions revoked");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // Access Token Checks
    // ═══════════════════════════════════════════════════════════

    /// Validate an access token's signature, validity window and type.
    ///
    /// Does not consult the revocation list; see
    /// [`AuthService::authenticate`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::WrongTokenType`].
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims> {
        self.tokens.expect_type(token, TokenType::Access)
    }

    /// Whether an access token was revoked by logout.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        self.env.revocations.is_blacklisted(token).await
    }

    /// Full request authentication: validate, require an access token,
    /// reject revoked tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`], [`AuthError::WrongTokenType`],
    /// [`AuthError::TokenRevoked`] or store errors.
    pub async fn authenticate(&self, token: &str) -> Result<TokenClaims> {
        let claims = self.validate_access_token(token)?;
        if self.is_blacklisted(token).await? {
            tracing::info!(user_id = %claims.user_id, "Revoked access token presented");
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    // ═══════════════════════════════════════════════════════════
    // One-Time Codes
    // ═══════════════════════════════════════════════════════════

    async fn check_rate_limit(&self, client_ip: &str) -> Result<()> {
        let scope = scopes::ip(client_ip);
        let count = self.env.rate_limiter.increment(&scope).await?;

        if count > u64::from(self.config.max_requests_per_ip_per_day) {
            let retry_after = self
                .env
                .rate_limiter
                .retry_after(&scope)
                .await?
                .unwrap_or(StdDuration::from_secs(RATE_LIMIT_WINDOW_SECS));
            tracing::warn!(client_ip = %client_ip, count, "Code request rate limit exceeded");
            return Err(AuthError::RateLimited { retry_after });
        }
        Ok(())
    }

    async fn store_new_code(&self, key: &str) -> Result<String> {
        let code = generate_numeric_code(CODE_LENGTH);
        self.env
            .codes
            .set(key, &code, self.config.verification_code_ttl)
            .await?;
        Ok(code)
    }

    async fn check_code(&self, key: &str, submitted: &str) -> Result<()> {
        let stored = self
            .env
            .codes
            .get(key)
            .await?
            .ok_or(AuthError::VerificationCodeExpired)?;

        if !constant_time_eq(stored.as_bytes(), submitted.trim().as_bytes()) {
            return Err(AuthError::WrongVerificationCode);
        }
        Ok(())
    }

    /// Mail a registration code to `email`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RateLimited`] once `client_ip` exceeds its daily budget
    /// - [`AuthError::InvalidEmail`], [`AuthError::UsernameTaken`],
    ///   [`AuthError::EmailTaken`]
    /// - store and mail errors
    pub async fn send_registration_code(
        &self,
        username: &str,
        email: &str,
        client_ip: &str,
    ) -> Result<()> {
        self.check_rate_limit(client_ip).await?;

        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if self.env.credentials.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.env.credentials.email_exists(email).await? {
            return Err(AuthError::EmailTaken);
        }

        let code = self.store_new_code(email).await?;
        self.env.mail.send_verification_code(email, &code).await?;

        tracing::info!(client_ip = %client_ip, "Registration code sent");
        Ok(())
    }

    /// Complete a registration with the mailed code.
    ///
    /// The account is created `inactive`. The code is consumed before the
    /// account is created, so it cannot be replayed.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidEmail`]
    /// - [`AuthError::VerificationCodeExpired`] /
    ///   [`AuthError::WrongVerificationCode`]
    /// - [`AuthError::UsernameTaken`] / [`AuthError::EmailTaken`] if another
    ///   registration won the race
    pub async fn register(&self, request: RegisterRequest) -> Result<Credential> {
        if !is_valid_email(&request.email) {
            return Err(AuthError::InvalidEmail);
        }

        self.check_code(&request.email, &request.verification_code)
            .await?;
        self.env.codes.delete(&request.email).await?;

        let credential = self
            .env
            .credentials
            .create_credential(NewCredential {
                username: request.username,
                email: request.email,
                password_hash: make_password_hash(&request.password),
            })
            .await?;

        tracing::info!(user_id = %credential.user_id, "Account registered");
        Ok(credential)
    }

    /// Mail a password reset code.
    ///
    /// Succeeds without sending anything when `email` is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RateLimited`], store or mail errors.
    pub async fn send_reset_code(&self, email: &str, client_ip: &str) -> Result<()> {
        self.check_rate_limit(client_ip).await?;

        if !self.env.credentials.email_exists(email).await? {
            tracing::debug!(client_ip = %client_ip, "Reset code requested for unknown email");
            return Ok(());
        }

        let code = self.store_new_code(&code_keys::reset(email)).await?;
        self.env.mail.send_reset_password_code(email, &code).await?;

        tracing::info!(client_ip = %client_ip, "Reset code sent");
        Ok(())
    }

    /// Set a new password with a mailed reset code.
    ///
    /// Revokes the user's refresh session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::VerificationCodeExpired`] /
    ///   [`AuthError::WrongVerificationCode`]
    /// - [`AuthError::ResourceNotFound`] if the account disappeared
    /// - store errors
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let key = code_keys::reset(email);
        self.check_code(&key, code).await?;

        let credential = self
            .env
            .credentials
            .find_by_email(email)
            .await?
            .ok_or(AuthError::ResourceNotFound)?;

        self.env
            .credentials
            .update_password_hash(credential.user_id, &make_password_hash(new_password))
            .await?;
        self.env.codes.delete(&key).await?;
        self.env.sessions.delete(credential.user_id).await?;

        tracing::info!(user_id = %credential.user_id, "Password reset");
        Ok(())
    }

    /// Mail an activation code to an inactive account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RateLimited`]
    /// - [`AuthError::ResourceNotFound`], [`AuthError::AccountAlreadyActive`],
    ///   [`AuthError::AccountBanned`]
    /// - store and mail errors
    pub async fn send_activation_code(&self, email: &str, client_ip: &str) -> Result<()> {
        self.check_rate_limit(client_ip).await?;

        let credential = self
            .env
            .credentials
            .find_by_email(email)
            .await?
            .ok_or(AuthError::ResourceNotFound)?;

        match credential.status {
            AccountStatus::Active => return Err(AuthError::AccountAlreadyActive),
            AccountStatus::Banned => return Err(AuthError::AccountBanned),
            AccountStatus::Inactive => {}
        }

        let code = self.store_new_code(email).await?;
        self.env.mail.send_verification_code(email, &code).await?;

        tracing::info!(user_id = %credential.user_id, "Activation code sent");
        Ok(())
    }

    /// Activate an account with the mailed code.
    ///
    /// # Errors
    ///
    /// - [`AuthError::VerificationCodeExpired`] /
    ///   [`AuthError::WrongVerificationCode`]
    /// - [`AuthError::ResourceNotFound`], [`AuthError::AccountAlreadyActive`],
    ///   [`AuthError::AccountBanned`]
    /// - store errors
    pub async fn activate_account(&self, email: &str, code: &str) -> Result<()> {
        self.check_code(email, code).await?;

        let credential = self
            .env
            .credentials
            .find_by_email(email)
            .await?
            .ok_or(AuthError::ResourceNotFound)?;

        match credential.status {
            AccountStatus::Active => {
                self.env.codes.delete(email).await?;
                return Err(AuthError::AccountAlreadyActive);
            }
            AccountStatus::Banned => return Err(AuthError::AccountBanned),
            AccountStatus::Inactive => {}
        }

        self.env
            .credentials
            .update_status(credential.user_id, AccountStatus::Active)
            .await?;
        self.env.codes.delete(email).await?;

        tracing::info!(user_id = %credential.user_id, "Account activated");
        Ok(())
    }

    /// Administrative password change. Revokes the user's refresh session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] or store errors.
    pub async fn set_password(&self, user_id: UserId, new_password: &str) -> Result<()> {
        if self.env.credentials.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::ResourceNotFound);
        }

        self.env
            .credentials
            .update_password_hash(user_id, &make_password_hash(new_password))
            .await?;
        self.env.sessions.delete(user_id).await?;

        tracing::info!(user_id = %user_id, "Password set by administrator");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // Devices
    // ═══════════════════════════════════════════════════════════

    /// A user's devices, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list_devices(&self, user_id: UserId) -> Result<Vec<DeviceRecord>> {
        self.device_trust.list_devices(user_id).await
    }

    /// Forget one of a user's devices.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] or repository errors.
    pub async fn remove_device(&self, user_id: UserId, device_id: DeviceId) -> Result<()> {
        self.device_trust.remove_device(user_id, device_id).await
    }

    /// Delete expired device challenges. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn purge_expired_challenges(&self) -> Result<u64> {
        self.device_trust.purge_expired_challenges().await
    }
}
