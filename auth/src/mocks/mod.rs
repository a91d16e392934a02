//! Mock provider implementations for testing.
//!
//! In-memory implementations of every provider trait for unit and
//! integration tests. Stores emulate TTL expiry against the wall clock, and
//! the mail mock records every mail it is asked to send.

pub mod code_store;
pub mod credential;
pub mod device;
pub mod email;
pub mod rate_limiter;
pub mod revocation;
pub mod session;

pub use code_store::MockVerificationCodeStore;
pub use credential::MockCredentialStore;
pub use device::MockDeviceRepository;
pub use email::{MockMailDispatcher, SentMail};
pub use rate_limiter::MockRateLimiter;
pub use revocation::MockAccessRevocationList;
pub use session::MockSessionStore;

use crate::error::{AuthError, Result};
use std::sync::{Mutex, MutexGuard};

/// Lock a mock's state, mapping poisoning to an internal error.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))
}

/// Convert a TTL to a std duration, treating non-positive values as zero.
pub(crate) fn to_std(ttl: chrono::Duration) -> std::time::Duration {
    ttl.to_std().unwrap_or(std::time::Duration::ZERO)
}
