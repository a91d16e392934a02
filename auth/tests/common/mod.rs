//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use trustgate_auth::mocks::{
    MockAccessRevocationList, MockCredentialStore, MockDeviceRepository, MockMailDispatcher,
    MockRateLimiter, MockSessionStore, MockVerificationCodeStore,
};
use trustgate_auth::{
    AccountStatus, AuthConfig, AuthService, Credential, DeviceMeta, LoginOutcome, LoginRequest,
    MockAuthEnvironment, TokenConfig, TokenPair,
};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "Password123!";
pub const CLIENT_IP: &str = "198.51.100.20";

pub type TestService = AuthService<
    MockCredentialStore,
    MockDeviceRepository,
    MockSessionStore,
    MockAccessRevocationList,
    MockVerificationCodeStore,
    MockRateLimiter,
    MockMailDispatcher,
>;

pub fn config() -> AuthConfig {
    AuthConfig::new(TokenConfig::new(SECRET))
}

pub fn service() -> TestService {
    service_with(config())
}

pub fn service_with(config: AuthConfig) -> TestService {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("trustgate_auth=debug")
        .try_init();
    AuthService::new(MockAuthEnvironment::mock(), config)
}

pub fn email_of(username: &str) -> String {
    format!("{username}@example.com")
}

/// Active account that has never logged in.
pub fn new_user(service: &TestService, username: &str) -> Credential {
    service
        .environment()
        .credentials
        .add_user(username, &email_of(username), PASSWORD, AccountStatus::Active)
        .expect("insert user")
}

pub fn device(fingerprint: &str) -> DeviceMeta {
    DeviceMeta {
        fingerprint: Some(fingerprint.to_string()),
        device_name: Some("Test laptop".to_string()),
        device_type: None,
        ip: CLIENT_IP.to_string(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
    }
}

pub fn login_request(username: &str, password: &str, fingerprint: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
        device: device(fingerprint),
        device_verification_code: None,
    }
}

pub fn with_code(request: LoginRequest, code: &str) -> LoginRequest {
    LoginRequest {
        device_verification_code: Some(code.to_string()),
        ..request
    }
}

pub fn tokens_of(outcome: &LoginOutcome) -> TokenPair {
    outcome.tokens().expect("login should issue tokens")
}

/// Register a user and log in once so `fingerprint` becomes trusted.
pub async fn logged_in_user(service: &TestService, username: &str, fingerprint: &str) -> (Credential, TokenPair) {
    let credential = new_user(service, username);
    let outcome = service
        .login(login_request(username, PASSWORD, fingerprint))
        .await
        .expect("first login");
    (credential, tokens_of(&outcome))
}
