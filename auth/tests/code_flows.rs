//! Registration, activation and password reset with mailed one-time codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use chrono::Duration;
use common::{CLIENT_IP, PASSWORD, config, logged_in_user, login_request, new_user, service, service_with};
use std::time::Duration as StdDuration;
use tokio_test::{assert_err, assert_ok};
use trustgate_auth::mocks::SentMail;
use trustgate_auth::providers::{CredentialStore, DeviceRepository, VerificationCodeStore};
use trustgate_auth::state::{DeviceChallenge, UserId};
use trustgate_auth::{AccountStatus, AuthError, RegisterRequest};

fn register_request(username: &str, email: &str, code: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        verification_code: code.to_string(),
    }
}

#[tokio::test]
async fn test_registration_creates_inactive_account() {
    let service = service();
    let env = service.environment();

    assert_ok!(service.send_registration_code("erin", "erin@example.com", CLIENT_IP).await);
    let sent = env.mail.sent().unwrap();
    assert!(matches!(&sent[..], [SentMail::VerificationCode { to, .. }] if to == "erin@example.com"));
    let code = env.mail.last_code_for("erin@example.com").unwrap().unwrap();

    let credential = assert_ok!(
        service
            .register(register_request("erin", "erin@example.com", &code))
            .await
    );
    assert_eq!(credential.status, AccountStatus::Inactive);
    assert!(credential.last_login_at.is_none());

    // First login inside the grace window works.
    let outcome = assert_ok!(service.login(login_request("erin", PASSWORD, "fp")).await);
    assert!(outcome.tokens().is_some());
}

#[tokio::test]
async fn test_registration_code_is_single_use() {
    let service = service();
    assert_ok!(service.send_registration_code("erin", "erin@example.com", CLIENT_IP).await);
    let code = service
        .environment()
        .mail
        .last_code_for("erin@example.com")
        .unwrap()
        .unwrap();

    assert_ok!(service.register(register_request("erin", "erin@example.com", &code)).await);

    let err = assert_err!(
        service
            .register(register_request("erin2", "erin@example.com", &code))
            .await
    );
    assert_eq!(err, AuthError::VerificationCodeExpired);
}

#[tokio::test]
async fn test_registration_wrong_code_keeps_code_valid() {
    let service = service();
    assert_ok!(service.send_registration_code("erin", "erin@example.com", CLIENT_IP).await);
    let code = service
        .environment()
        .mail
        .last_code_for("erin@example.com")
        .unwrap()
        .unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let err = assert_err!(service.register(register_request("erin", "erin@example.com", wrong)).await);
    assert_eq!(err, AuthError::WrongVerificationCode);

    assert_ok!(service.register(register_request("erin", "erin@example.com", &code)).await);
}

#[tokio::test]
async fn test_registration_without_code_is_expired() {
    let service = service();
    let err = assert_err!(
        service
            .register(register_request("erin", "erin@example.com", "123456"))
            .await
    );
    assert_eq!(err, AuthError::VerificationCodeExpired);
}

#[tokio::test]
async fn test_registration_code_expires() {
    let service = service_with(config().with_verification_code_ttl(Duration::milliseconds(50)));
    assert_ok!(service.send_registration_code("erin", "erin@example.com", CLIENT_IP).await);
    let code = service
        .environment()
        .mail
        .last_code_for("erin@example.com")
        .unwrap()
        .unwrap();

    tokio::time::sleep(StdDuration::from_millis(80)).await;

    let err = assert_err!(service.register(register_request("erin", "erin@example.com", &code)).await);
    assert_eq!(err, AuthError::VerificationCodeExpired);
}

#[tokio::test]
async fn test_registration_code_checks_uniqueness() {
    let service = service();
    new_user(&service, "alice");

    assert_eq!(
        assert_err!(
            service
                .send_registration_code("alice", "new@example.com", CLIENT_IP)
                .await
        ),
        AuthError::UsernameTaken
    );
    assert_eq!(
        assert_err!(
            service
                .send_registration_code("newbie", "alice@example.com", CLIENT_IP)
                .await
        ),
        AuthError::EmailTaken
    );
    assert_eq!(
        assert_err!(service.send_registration_code("newbie", "not-an-email", CLIENT_IP).await),
        AuthError::InvalidEmail
    );
    assert_eq!(service.environment().mail.count().unwrap(), 0);
}

#[tokio::test]
async fn test_register_race_reports_taken_username() {
    let service = service();
    assert_ok!(service.send_registration_code("erin", "erin@example.com", CLIENT_IP).await);
    let code = service
        .environment()
        .mail
        .last_code_for("erin@example.com")
        .unwrap()
        .unwrap();

    // Someone else claims the username between code issuance and registration.
    new_user(&service, "erin");

    let err = assert_err!(service.register(register_request("erin", "erin@example.com", &code)).await);
    assert_eq!(err, AuthError::UsernameTaken);
}

#[tokio::test]
async fn test_code_mail_failure_is_reported() {
    let service = service();
    service.environment().mail.set_failing(true);

    let err = assert_err!(
        service
            .send_registration_code("erin", "erin@example.com", CLIENT_IP)
            .await
    );
    assert!(matches!(err, AuthError::EmailDeliveryFailed(_)));
}

#[tokio::test]
async fn test_password_reset_replaces_password_and_ends_session() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(service.send_reset_code("alice@example.com", CLIENT_IP).await);
    let sent = service.environment().mail.sent().unwrap();
    let Some(SentMail::ResetPasswordCode { code, .. }) = sent.last() else {
        panic!("expected a reset mail, got {sent:?}");
    };

    assert_ok!(
        service
            .reset_password("alice@example.com", code, "NewPassword456!")
            .await
    );

    assert_eq!(
        assert_err!(service.refresh_token(&tokens.refresh_token).await),
        AuthError::SessionNotFound
    );
    assert_eq!(
        assert_err!(service.login(login_request("alice", PASSWORD, "fp")).await),
        AuthError::InvalidCredentials
    );
    assert_ok!(service.login(login_request("alice", "NewPassword456!", "fp")).await);

    // The code is gone.
    assert_eq!(
        assert_err!(service.reset_password("alice@example.com", code, "Again789!").await),
        AuthError::VerificationCodeExpired
    );
}

#[tokio::test]
async fn test_bare_email_code_does_not_reset_password() {
    let service = service();
    new_user(&service, "alice");
    assert_ok!(
        service
            .environment()
            .codes
            .set("alice@example.com", "111111", Duration::minutes(5))
            .await
    );

    let err = assert_err!(
        service
            .reset_password("alice@example.com", "111111", "Hijacked1!")
            .await
    );
    assert_eq!(err, AuthError::VerificationCodeExpired);
}

#[tokio::test]
async fn test_activation_flow() {
    let service = service();
    service
        .environment()
        .credentials
        .add_user("frank", "frank@example.com", PASSWORD, AccountStatus::Inactive)
        .unwrap();

    assert_ok!(service.send_activation_code("frank@example.com", CLIENT_IP).await);
    let code = service
        .environment()
        .mail
        .last_code_for("frank@example.com")
        .unwrap()
        .unwrap();

    assert_ok!(service.activate_account("frank@example.com", &code).await);

    let credential = assert_ok!(service.environment().credentials.find_by_email("frank@example.com").await)
        .unwrap();
    assert_eq!(credential.status, AccountStatus::Active);

    assert_eq!(
        assert_err!(service.send_activation_code("frank@example.com", CLIENT_IP).await),
        AuthError::AccountAlreadyActive
    );
    assert_eq!(
        assert_err!(service.activate_account("frank@example.com", &code).await),
        AuthError::VerificationCodeExpired
    );
}

#[tokio::test]
async fn test_activation_rejections() {
    let service = service();
    service
        .environment()
        .credentials
        .add_user("gina", "gina@example.com", PASSWORD, AccountStatus::Banned)
        .unwrap();

    assert_eq!(
        assert_err!(service.send_activation_code("gina@example.com", CLIENT_IP).await),
        AuthError::AccountBanned
    );
    assert_eq!(
        assert_err!(service.send_activation_code("ghost@example.com", CLIENT_IP).await),
        AuthError::ResourceNotFound
    );
}

#[tokio::test]
async fn test_set_password_revokes_session() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(service.set_password(user.user_id, "AdminChosen1!").await);

    assert_eq!(
        assert_err!(service.refresh_token(&tokens.refresh_token).await),
        AuthError::SessionNotFound
    );
    assert_ok!(service.login(login_request("alice", "AdminChosen1!", "fp")).await);

    assert_eq!(
        assert_err!(service.set_password(UserId::new(), "x").await),
        AuthError::ResourceNotFound
    );
}

#[tokio::test]
async fn test_purge_expired_challenges() {
    let service = service();
    let (user, _) = logged_in_user(&service, "alice", "fp").await;
    let devices = &service.environment().devices;
    let now = chrono::Utc::now();

    for expires_at in [now - Duration::minutes(10), now + Duration::minutes(5)] {
        let challenge = DeviceChallenge {
            id: uuid::Uuid::new_v4(),
            user_id: user.user_id,
            fingerprint: "fp-other".into(),
            code: "123456".into(),
            attempt_count: 0,
            ip_address: CLIENT_IP.into(),
            user_agent: "test".into(),
            is_verified: false,
            expires_at,
            verified_at: None,
            created_at: now,
        };
        assert_ok!(devices.create_challenge(&challenge).await);
    }

    assert_eq!(assert_ok!(service.purge_expired_challenges().await), 1);
    assert_eq!(devices.challenges_for(user.user_id).unwrap().len(), 1);
}
