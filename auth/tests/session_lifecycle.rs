//! Refresh sessions, logout and access token revocation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::Duration;
use common::{PASSWORD, logged_in_user, login_request, service, tokens_of};
use tokio_test::{assert_err, assert_ok};
use trustgate_auth::providers::{CredentialStore, SessionStore};
use trustgate_auth::{AccountStatus, AuthError, TokenType};

#[tokio::test]
async fn test_session_is_valid_right_after_login() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    let sessions = &service.environment().sessions;
    assert!(assert_ok!(sessions.validate(user.user_id, &tokens.refresh_token).await));
    assert_eq!(
        sessions.active_token(user.user_id).unwrap().as_deref(),
        Some(tokens.refresh_token.as_str())
    );
}

#[tokio::test]
async fn test_second_login_invalidates_first_refresh_token() {
    let service = service();
    let (_, first) = logged_in_user(&service, "alice", "fp").await;

    let outcome = assert_ok!(service.login(login_request("alice", PASSWORD, "fp")).await);
    let second = tokens_of(&outcome);
    assert_ne!(first.refresh_token, second.refresh_token);

    let err = assert_err!(service.refresh_token(&first.refresh_token).await);
    assert_eq!(err, AuthError::SessionNotFound);
    assert_ok!(service.refresh_token(&second.refresh_token).await);
}

#[tokio::test]
async fn test_refresh_issues_usable_access_token() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    let access = assert_ok!(service.refresh_token(&tokens.refresh_token).await);
    let claims = assert_ok!(service.authenticate(&access).await);
    assert_eq!(claims.user_id, user.user_id);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.token_type, TokenType::Access);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;

    let err = assert_err!(service.refresh_token(&tokens.access_token).await);
    assert_eq!(err, AuthError::WrongTokenType);
}

#[tokio::test]
async fn test_refresh_rejects_garbage() {
    let service = service();
    let err = assert_err!(service.refresh_token("not.a.token").await);
    assert_eq!(err, AuthError::InvalidToken);
}

#[tokio::test]
async fn test_logout_revokes_access_and_ends_session() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(service.logout(&tokens.access_token, &tokens.refresh_token).await);

    assert!(assert_ok!(service.is_blacklisted(&tokens.access_token).await));
    assert_eq!(
        assert_err!(service.authenticate(&tokens.access_token).await),
        AuthError::TokenRevoked
    );
    assert_eq!(
        assert_err!(service.refresh_token(&tokens.refresh_token).await),
        AuthError::SessionNotFound
    );
}

#[tokio::test]
async fn test_logout_twice_is_harmless() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(service.logout(&tokens.access_token, &tokens.refresh_token).await);
    assert_ok!(service.logout(&tokens.access_token, &tokens.refresh_token).await);
}

#[tokio::test]
async fn test_revocation_ttl_matches_remaining_lifetime() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    let access = service
        .tokens()
        .issue_single(user.user_id, "alice", TokenType::Access, Duration::seconds(600))
        .unwrap();

    assert_ok!(service.logout(&access, &tokens.refresh_token).await);

    let ttl = service
        .environment()
        .revocations
        .ttl_of(&access)
        .unwrap()
        .expect("token revoked");
    assert!(ttl <= Duration::seconds(600), "ttl {ttl} too long");
    assert!(ttl >= Duration::seconds(597), "ttl {ttl} too short");
    assert_eq!(
        service.environment().revocations.owner_of(&access).unwrap(),
        Some(user.user_id)
    );
}

#[tokio::test]
async fn test_logout_with_expired_access_token_still_ends_session() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    let expired = service
        .tokens()
        .issue_single(user.user_id, "alice", TokenType::Access, Duration::seconds(-5))
        .unwrap();

    assert_ok!(service.logout(&expired, &tokens.refresh_token).await);

    assert!(service.environment().revocations.is_empty().unwrap());
    assert_eq!(
        assert_err!(service.refresh_token(&tokens.refresh_token).await),
        AuthError::SessionNotFound
    );
}

#[tokio::test]
async fn test_logout_rejects_tokens_of_different_users() {
    let service = service();
    let (_, alice) = logged_in_user(&service, "alice", "fp-a").await;
    let (_, bob) = logged_in_user(&service, "bob", "fp-b").await;

    let err = assert_err!(service.logout(&alice.access_token, &bob.refresh_token).await);
    assert_eq!(err, AuthError::TokenOwnerMismatch);
    assert!(err.is_security_issue());

    // Nothing was revoked.
    assert!(!assert_ok!(service.is_blacklisted(&alice.access_token).await));
    assert_ok!(service.refresh_token(&bob.refresh_token).await);
}

#[tokio::test]
async fn test_logout_rejects_swapped_tokens() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;

    let err = assert_err!(service.logout(&tokens.refresh_token, &tokens.access_token).await);
    assert_eq!(err, AuthError::WrongTokenType);

    let err = assert_err!(service.logout(&tokens.refresh_token, &tokens.refresh_token).await);
    assert_eq!(err, AuthError::WrongTokenType);
}

#[tokio::test]
async fn test_refresh_for_banned_account_drops_session() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;
    let env = service.environment();

    assert_ok!(env.credentials.update_status(user.user_id, AccountStatus::Banned).await);

    let err = assert_err!(service.refresh_token(&tokens.refresh_token).await);
    assert_eq!(err, AuthError::AccountBanned);
    assert_eq!(env.sessions.active_token(user.user_id).unwrap(), None);
}

#[tokio::test]
async fn test_refresh_for_deactivated_account_is_rejected() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(
        service
            .environment()
            .credentials
            .update_status(user.user_id, AccountStatus::Inactive)
            .await
    );

    let err = assert_err!(service.refresh_token(&tokens.refresh_token).await);
    assert_eq!(err, AuthError::AccountInactive);
}

#[tokio::test]
async fn test_revoke_sessions_ends_refresh() {
    let service = service();
    let (user, tokens) = logged_in_user(&service, "alice", "fp").await;

    assert_ok!(service.revoke_sessions(user.user_id).await);

    assert_eq!(
        assert_err!(service.refresh_token(&tokens.refresh_token).await),
        AuthError::SessionNotFound
    );
    // The access token lives on until it expires.
    assert_ok!(service.authenticate(&tokens.access_token).await);
}

#[tokio::test]
async fn test_session_store_outage_surfaces_as_server_error() {
    let service = service();
    let (_, tokens) = logged_in_user(&service, "alice", "fp").await;
    service.environment().sessions.set_unavailable(true);

    let err = assert_err!(service.refresh_token(&tokens.refresh_token).await);
    assert!(matches!(err, AuthError::DownstreamUnavailable(_)));
    assert!(err.is_server_error());
}
