//! Password login and device step-up, end to end over the mock providers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use chrono::{Duration, Utc};
use common::{
    CLIENT_IP, PASSWORD, logged_in_user, login_request, new_user, service, tokens_of, with_code,
};
use tokio_test::{assert_err, assert_ok};
use trustgate_auth::mocks::SentMail;
use trustgate_auth::providers::{DeviceRepository, SessionStore};
use trustgate_auth::{AccountStatus, AuthError, Credential, LoginOutcome, UserId};

#[tokio::test]
async fn test_brand_new_user_logs_in_without_challenge() {
    let service = service();
    let user = new_user(&service, "alice");

    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp-laptop")).await);
    let tokens = tokens_of(&outcome);

    let env = service.environment();
    assert!(assert_ok!(env.sessions.validate(user.user_id, &tokens.refresh_token).await));

    let device = assert_ok!(env.devices.find_device(user.user_id, "fp-laptop").await)
        .expect("device recorded");
    assert!(device.trusted);
    assert_eq!(device.device_name, "Test laptop");
    assert_eq!(device.device_type, "desktop");

    assert_eq!(env.mail.count().unwrap(), 0);
    assert!(env.credentials.get(user.user_id).unwrap().unwrap().last_login_at.is_some());
}

#[tokio::test]
async fn test_authenticated_outcome_carries_user_summary() {
    let service = service();
    let user = new_user(&service, "alice");

    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp")).await);
    let LoginOutcome::Authenticated { user: summary, .. } = outcome else {
        panic!("expected tokens");
    };
    assert_eq!(summary.user_id, user.user_id);
    assert_eq!(summary.email, "alice@example.com");
    assert!(summary.last_login_at.is_some());
}

#[tokio::test]
async fn test_trusted_device_skips_challenge() {
    let service = service();
    logged_in_user(&service, "alice", "fp").await;

    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp")).await);
    assert!(outcome.tokens().is_some());
    assert_eq!(service.environment().mail.count().unwrap(), 0);
}

#[tokio::test]
async fn test_trusted_device_with_wrong_password_is_invalid_credentials() {
    let service = service();
    logged_in_user(&service, "alice", "fp").await;

    let err = assert_err!(service.login(login_request("alice", "wrong", "fp")).await);
    assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn test_unknown_username_looks_like_wrong_password() {
    let service = service();
    logged_in_user(&service, "alice", "fp").await;

    let unknown = assert_err!(service.login(login_request("mallory", PASSWORD, "fp")).await);
    let wrong = assert_err!(service.login(login_request("alice", "nope", "fp")).await);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_unknown_device_requires_code_then_issues_tokens() {
    let service = service();
    let (user, _) = logged_in_user(&service, "alice", "fp-laptop").await;
    let env = service.environment();

    let request = login_request("alice", PASSWORD, "fp-phone");
    let outcome = assert_ok!(service.login(request.clone()).await);
    assert!(outcome.is_verification_required());
    assert!(outcome.tokens().is_none());

    let sent = env.mail.sent().unwrap();
    assert_eq!(sent.len(), 1);
    let SentMail::DeviceVerificationCode { to, code, device_label, ip, .. } = &sent[0] else {
        panic!("expected a device code mail, got {sent:?}");
    };
    assert_eq!(to, "alice@example.com");
    assert_eq!(device_label, "Test laptop");
    assert_eq!(ip, CLIENT_IP);
    assert_eq!(code.len(), 6);
    assert!(!assert_ok!(env.sessions.validate(user.user_id, "anything").await));

    let outcome = assert_ok!(service.login(with_code(request, code)).await);
    let tokens = tokens_of(&outcome);
    assert!(assert_ok!(env.sessions.validate(user.user_id, &tokens.refresh_token).await));

    let phone = assert_ok!(env.devices.find_device(user.user_id, "fp-phone").await).unwrap();
    assert!(phone.trusted);

    // Next time the phone is recognised.
    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp-phone")).await);
    assert!(outcome.tokens().is_some());
}

#[tokio::test]
async fn test_returning_user_without_fingerprint_is_rejected() {
    let service = service();
    logged_in_user(&service, "alice", "fp").await;

    let mut request = login_request("alice", PASSWORD, "");
    request.device.fingerprint = None;

    let err = assert_err!(service.login(request).await);
    assert_eq!(err, AuthError::DeviceFingerprintRequired);
}

#[tokio::test]
async fn test_first_login_without_fingerprint_succeeds() {
    let service = service();
    let user = new_user(&service, "alice");

    let mut request = login_request("alice", PASSWORD, "");
    request.device.fingerprint = None;

    let outcome = assert_ok!(service.login(request).await);
    assert!(outcome.tokens().is_some());
    assert!(assert_ok!(service.environment().devices.list_devices(user.user_id).await).is_empty());
}

#[tokio::test]
async fn test_device_mail_failure_aborts_login() {
    let service = service();
    let (user, first) = logged_in_user(&service, "alice", "fp").await;
    let env = service.environment();
    env.mail.set_failing(true);

    let err = assert_err!(service.login(login_request("alice", PASSWORD, "fp-new")).await);
    assert!(matches!(err, AuthError::EmailDeliveryFailed(_)));
    assert!(err.is_server_error());

    // The earlier session is untouched.
    assert!(assert_ok!(env.sessions.validate(user.user_id, &first.refresh_token).await));
}

#[tokio::test]
async fn test_last_login_failure_aborts_login() {
    let service = service();
    let user = new_user(&service, "alice");
    let env = service.environment();
    env.credentials.set_fail_record_login(true);

    let err = assert_err!(service.login(login_request("alice", PASSWORD, "fp")).await);
    assert!(matches!(err, AuthError::DatabaseError(_)));
    assert!(env.sessions.active_token(user.user_id).unwrap().is_none());

    // Still a first login, so no other device gets in without a challenge
    // once the store recovers.
    env.credentials.set_fail_record_login(false);
    assert_ok!(service.login(login_request("alice", PASSWORD, "fp")).await);
    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp-other")).await);
    assert!(outcome.is_verification_required());
}

#[tokio::test]
async fn test_removed_device_needs_new_challenge() {
    let service = service();
    let (user, _) = logged_in_user(&service, "alice", "fp").await;

    let devices = assert_ok!(service.list_devices(user.user_id).await);
    assert_eq!(devices.len(), 1);
    assert_ok!(service.remove_device(user.user_id, devices[0].id).await);
    assert!(assert_ok!(service.list_devices(user.user_id).await).is_empty());

    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp")).await);
    assert!(outcome.is_verification_required());
}

#[tokio::test]
async fn test_remove_device_of_other_user_is_not_found() {
    let service = service();
    let (alice, _) = logged_in_user(&service, "alice", "fp").await;
    let device_id = assert_ok!(service.list_devices(alice.user_id).await)[0].id;

    let err = assert_err!(service.remove_device(UserId::new(), device_id).await);
    assert_eq!(err, AuthError::ResourceNotFound);
}

#[tokio::test]
async fn test_banned_account_is_reported_after_password_check() {
    let service = service();
    service
        .environment()
        .credentials
        .add_user("bob", "bob@example.com", PASSWORD, AccountStatus::Banned)
        .unwrap();

    assert_eq!(
        assert_err!(service.login(login_request("bob", PASSWORD, "fp")).await),
        AuthError::AccountBanned
    );
    assert_eq!(
        assert_err!(service.login(login_request("bob", "wrong", "fp")).await),
        AuthError::InvalidCredentials
    );
}

#[tokio::test]
async fn test_inactive_account_gets_one_bootstrap_login_within_grace() {
    let service = service();
    service
        .environment()
        .credentials
        .add_user("carol", "carol@example.com", PASSWORD, AccountStatus::Inactive)
        .unwrap();

    let outcome = assert_ok!(service.login(login_request("carol", PASSWORD, "fp")).await);
    assert!(outcome.tokens().is_some());

    let err = assert_err!(service.login(login_request("carol", PASSWORD, "fp")).await);
    assert_eq!(err, AuthError::AccountInactive);
}

#[tokio::test]
async fn test_inactive_account_past_grace_is_rejected() {
    let service = service();
    let now = Utc::now();
    service
        .environment()
        .credentials
        .insert(Credential {
            user_id: UserId::new(),
            username: "dave".into(),
            email: "dave@example.com".into(),
            password_hash: trustgate_auth::credentials::make_password_hash(PASSWORD),
            status: AccountStatus::Inactive,
            last_login_at: None,
            created_at: now - Duration::hours(25),
        })
        .unwrap();

    let err = assert_err!(service.login(login_request("dave", PASSWORD, "fp")).await);
    assert_eq!(err, AuthError::AccountInactive);
}
