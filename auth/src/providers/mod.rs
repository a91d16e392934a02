//! Authentication providers.
//!
//! This module defines one trait per external capability the authentication
//! core depends on. [`crate::service::AuthService`] is generic over these
//! traits, so the same flows run against Redis/PostgreSQL/SMTP in production
//! and against the in-memory mocks in tests.
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────────┐
//! │ AuthService          │────▶│ CredentialStore          │  PostgreSQL
//! │  login / refresh /   │     │ DeviceRepository         │  PostgreSQL
//! │  logout / codes      │     ├──────────────────────────┤
//! │                      │────▶│ SessionStore             │  Redis
//! │                      │     │ AccessRevocationList     │  Redis
//! │                      │     │ VerificationCodeStore    │  Redis
//! │                      │     │ RateLimiter              │  Redis
//! │                      │     ├──────────────────────────┤
//! │                      │────▶│ MailDispatcher           │  SMTP / console
//! └──────────────────────┘     └──────────────────────────┘
//! ```

pub mod code_store;
pub mod console_email;
pub mod credential;
pub mod device;
pub mod email;
pub mod rate_limiter;
pub mod revocation;
pub mod session;
pub mod smtp_email;

// Re-export provider traits
pub use code_store::VerificationCodeStore;
pub use console_email::ConsoleMailDispatcher;
pub use credential::CredentialStore;
pub use device::DeviceRepository;
pub use email::MailDispatcher;
pub use rate_limiter::RateLimiter;
pub use revocation::AccessRevocationList;
pub use session::SessionStore;
pub use smtp_email::{SmtpMailDispatcher, SmtpSettings};
