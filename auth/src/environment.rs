//! Authentication environment.
//!
//! Bundles the backing providers [`crate::service::AuthService`] runs
//! against. Production wiring uses the Redis and Postgres stores; tests use
//! the in-memory mocks.

use crate::providers::{
    AccessRevocationList, CredentialStore, DeviceRepository, MailDispatcher, RateLimiter,
    SessionStore, VerificationCodeStore,
};

/// Authentication environment.
///
/// # Type Parameters
///
/// - `C`: Credential store
/// - `D`: Device repository
/// - `S`: Refresh session store
/// - `R`: Access token revocation list
/// - `V`: Verification code store
/// - `L`: Rate limiter
/// - `M`: Mail dispatcher
#[derive(Debug, Clone)]
pub struct AuthEnvironment<C, D, S, R, V, L, M>
where
    C: CredentialStore + Clone,
    D: DeviceRepository + Clone,
    S: SessionStore + Clone,
    R: AccessRevocationList + Clone,
    V: VerificationCodeStore + Clone,
    L: RateLimiter + Clone,
    M: MailDispatcher + Clone + 'static,
{
    /// Credential store (`PostgreSQL`).
    pub credentials: C,

    /// Device registry and challenges (`PostgreSQL`).
    pub devices: D,

    /// Refresh sessions (`Redis` - one per user).
    pub sessions: S,

    /// Revoked access tokens (`Redis` - expire with the token).
    pub revocations: R,

    /// Registration, reset and activation codes (`Redis`).
    pub codes: V,

    /// Per-IP request counters (`Redis`).
    pub rate_limiter: L,

    /// Outbound mail.
    pub mail: M,
}

impl<C, D, S, R, V, L, M> AuthEnvironment<C, D, S, R, V, L, M>
where
    C: CredentialStore + Clone,
    D: DeviceRepository + Clone,
    S: SessionStore + Clone,
    R: AccessRevocationList + Clone,
    V: VerificationCodeStore + Clone,
    L: RateLimiter + Clone,
    M: MailDispatcher + Clone + 'static,
{
    /// Create a new authentication environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        credentials: C,
        devices: D,
        sessions: S,
        revocations: R,
        codes: V,
        rate_limiter: L,
        mail: M,
    ) -> Self {
        Self {
            credentials,
            devices,
            sessions,
            revocations,
            codes,
            rate_limiter,
            mail,
        }
    }
}

#[cfg(feature = "test-utils")]
mod mock_env {
    use super::AuthEnvironment;
    use crate::mocks::{
        MockAccessRevocationList, MockCredentialStore, MockDeviceRepository, MockMailDispatcher,
        MockRateLimiter, MockSessionStore, MockVerificationCodeStore,
    };

    /// Environment wired entirely to in-memory mocks.
    pub type MockAuthEnvironment = AuthEnvironment<
        MockCredentialStore,
        MockDeviceRepository,
        MockSessionStore,
        MockAccessRevocationList,
        MockVerificationCodeStore,
        MockRateLimiter,
        MockMailDispatcher,
    >;

    impl MockAuthEnvironment {
        /// Create an environment with fresh, empty mocks.
        #[must_use]
        pub fn mock() -> Self {
            Self::new(
                MockCredentialStore::new(),
                MockDeviceRepository::new(),
                MockSessionStore::new(),
                MockAccessRevocationList::new(),
                MockVerificationCodeStore::new(),
                MockRateLimiter::new(),
                MockMailDispatcher::new(),
            )
        }
    }
}

#[cfg(feature = "test-utils")]
pub use mock_env::MockAuthEnvironment;
