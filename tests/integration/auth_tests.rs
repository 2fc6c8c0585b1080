//! Authentication integration tests.
//!
//! Tests verify:
//! - Registration and login
//! - Valid bearer tokens work
//! - Missing, malformed, expired and forged tokens are rejected

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use facedetect_api::{TokenAuth, UserId};

use super::test_utils::{
    body_json, detection_body, get, post_json, register_and_login, send, test_router, TEST_SECRET,
};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_profile_without_hash() {
    let (router, store) = test_router();

    let response = send(
        &router,
        post_json(
            "/api/auth/register",
            None,
            json!({"name": "Ada", "email": "Ada@Example.com", "password": "pw-123456"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["name"], "Ada");
    assert!(json["user"].get("passwordHash").is_none());
    assert_eq!(store.user_len().await, 1);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (router, store) = test_router();

    for body in [
        json!({"email": "a@example.com", "password": "pw"}),
        json!({"name": "A", "password": "pw"}),
        json!({"name": "A", "email": "a@example.com"}),
        json!({}),
    ] {
        let response = send(&router, post_json("/api/auth/register", None, body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(store.user_len().await, 0);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (router, _) = test_router();
    register_and_login(&router, "dup@example.com").await;

    let response = send(
        &router,
        post_json(
            "/api/auth/register",
            None,
            json!({"name": "Other", "email": "DUP@example.com", "password": "x"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "user_exists");
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_issues_working_token() {
    let (router, _) = test_router();
    let (token, user_id) = register_and_login(&router, "login@example.com").await;

    assert_eq!(TokenAuth::new(TEST_SECRET).verify(&token), Ok(user_id));

    let response = send(
        &router,
        get(&format!("/api/facedetect/history/{}", user_id), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email() {
    let (router, _) = test_router();
    register_and_login(&router, "known@example.com").await;

    for body in [
        json!({"email": "known@example.com", "password": "wrong"}),
        json!({"email": "unknown@example.com", "password": "secret-password"}),
    ] {
        let response = send(&router, post_json("/api/auth/login", None, body)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_credentials");
    }
}

#[tokio::test]
async fn test_login_missing_fields() {
    let (router, _) = test_router();
    let response = send(
        &router,
        post_json("/api/auth/login", None, json!({"email": "a@example.com"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Token Enforcement
// =============================================================================

#[tokio::test]
async fn test_missing_token_rejected() {
    let (router, store) = test_router();

    let response = send(
        &router,
        post_json("/api/facedetect/detect", None, detection_body()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "missing_token");
    assert_eq!(store.history_len().await, 0);
}

#[tokio::test]
async fn test_non_bearer_header_rejected() {
    let (router, _) = test_router();

    let request = Request::builder()
        .uri(format!("/api/facedetect/history/{}", UserId::new()))
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "malformed_header");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (router, _) = test_router();

    let response = send(
        &router,
        get(
            &format!("/api/facedetect/history/{}", UserId::new()),
            Some("not-a-token"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "malformed_token");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (router, _) = test_router();
    let user = UserId::new();

    let expired = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - 100;
    let token = TokenAuth::new(TEST_SECRET).issue_with_expiry(&user, expired);

    let response = send(
        &router,
        get(&format!("/api/facedetect/history/{}", user), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "token_expired");
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let (router, _) = test_router();
    let user = UserId::new();
    let (token, _) = TokenAuth::new("some-other-secret-entirely").issue(&user);

    let response = send(
        &router,
        delete_detection_request(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_signature");
}

fn delete_detection_request(token: &str) -> Request<Body> {
    super::test_utils::delete(
        &format!("/api/facedetect/delete/{}", facedetect_api::RecordId::new()),
        Some(token),
    )
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let (router, _) = test_router();

    for uri in ["/", "/health"] {
        let response = send(&router, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}
