//! # Trustgate Authentication Core
//!
//! Session and device-trust authentication: password verification,
//! access/refresh token issuance and revocation, step-up verification of
//! unrecognised devices through emailed one-time codes, and the rate limiting
//! and one-time code plumbing behind registration, activation and password
//! reset.
//!
//! ## Features
//!
//! - **Dual tokens**: short-lived HS256 access tokens, long-lived refresh
//!   tokens with one server-side session per user
//! - **Revocation**: logged-out access tokens are blacklisted until they expire
//! - **Device trust**: a returning user on an unknown device must confirm a
//!   mailed code; five wrong guesses lock the challenge
//! - **Abuse limits**: per-IP daily budget on every code-issuing operation
//! - **Testable**: every backing service is a trait with an in-memory mock
//!
//! ## Architecture
//!
//! ```text
//! LoginRequest → credentials::verify → DeviceTrustEngine::evaluate
//!              → TokenService::issue_pair → SessionStore::store → LoginOutcome
//! ```
//!
//! ## Example: Login With Device Step-Up
//!
//! ```rust,ignore
//! use trustgate_auth::*;
//!
//! let service = AuthService::new(env, AuthConfig::from_env()?);
//!
//! // 1. Unknown device: a code is mailed, no tokens yet
//! let outcome = service.login(request.clone()).await?;
//! assert!(outcome.is_verification_required());
//!
//! // 2. Resubmit with the mailed code
//! let outcome = service
//!     .login(LoginRequest { device_verification_code: Some(code), ..request })
//!     .await?;
//! let tokens = outcome.tokens().unwrap();
//!
//! // 3. Authenticate requests, refresh, log out
//! let claims = service.authenticate(&tokens.access_token).await?;
//! let access = service.refresh_token(&tokens.refresh_token).await?;
//! service.logout(&access, &tokens.refresh_token).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod constants;
pub mod credentials;
pub mod device_trust;
pub mod environment;
pub mod error;
pub mod providers;
pub mod service;
pub mod state;
pub mod stores;
pub mod tokens;
pub mod utils;

// Mock providers for testing
#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use config::{AuthConfig, ConfigError, TokenConfig};
pub use device_trust::{DeviceDecision, DeviceTrustEngine};
pub use environment::AuthEnvironment;
#[cfg(feature = "test-utils")]
pub use environment::MockAuthEnvironment;
pub use error::{AuthError, Result};
pub use service::AuthService;
pub use state::{
    AccountStatus, Credential, DeviceMeta, DeviceRecord, LoginOutcome, LoginRequest,
    RegisterRequest, TokenClaims, TokenPair, TokenType, UserId, UserSummary,
};
pub use tokens::TokenService;
