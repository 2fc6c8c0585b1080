//! Test utilities for integration tests.
//!
//! Builds routers over in-memory or deliberately broken stores and provides
//! request helpers.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use facedetect_api::account::User;
use facedetect_api::error::StoreError;
use facedetect_api::{
    create_router, History, HistoryStore, MemoryStore, RecordId, RouterConfig, TokenAuth,
    UserId, UserStore,
};

pub const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

/// Tiny but valid data URIs standing in for captured images.
pub const ORIGINAL_IMAGE: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";
pub const RESULT_IMAGE: &str = "data:image/jpeg;base64,/9j/2wBDAAgGBgcGBQ==";

// =============================================================================
// Routers
// =============================================================================

/// Router configuration used by the tests: fast hashing, no tracing.
pub fn test_config() -> RouterConfig {
    RouterConfig::new(TEST_SECRET)
        .with_password_iterations(10)
        .with_tracing(false)
}

/// Router over a fresh in-memory store; the store handle is returned for
/// direct inspection.
pub fn test_router() -> (Router, MemoryStore) {
    test_router_with(test_config())
}

pub fn test_router_with(config: RouterConfig) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    (create_router(store.clone(), config), store)
}

/// A token for `user` signed with the test secret.
pub fn token_for(user: &UserId) -> String {
    TokenAuth::new(TEST_SECRET).issue(user).0
}

// =============================================================================
// Requests
// =============================================================================

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token, None)
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::DELETE, uri, token, None)
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(Method::POST, uri, token, Some(body))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Body of a detection submission with both images.
pub fn detection_body() -> Value {
    json!({
        "originalImage": ORIGINAL_IMAGE,
        "resultImage": RESULT_IMAGE,
    })
}

/// Save a detection through the API and return the stored record.
pub async fn create_detection(router: &Router, token: &str, body: Value) -> Value {
    let response = send(router, post_json("/api/facedetect/detect", Some(token), body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["detection"].clone()
}

/// Register then log in; returns the token and the user id.
pub async fn register_and_login(router: &Router, email: &str) -> (String, UserId) {
    let response = send(
        router,
        post_json(
            "/api/auth/register",
            None,
            json!({"name": "Test User", "email": email, "password": "secret-password"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        router,
        post_json(
            "/api/auth/login",
            None,
            json!({"email": email, "password": "secret-password"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    (token, user_id)
}

// =============================================================================
// Faulty Store
// =============================================================================

/// How [`FaultyStore`] misbehaves on every call.
#[derive(Clone, Copy)]
pub enum Fault {
    /// Return a storage error
    Error,
    /// Panic inside the handler
    Panic,
}

/// A store whose every operation fails.
#[derive(Clone, Copy)]
pub struct FaultyStore(pub Fault);

impl FaultyStore {
    fn fail<T>(&self) -> Result<T, StoreError> {
        match self.0 {
            Fault::Error => Err(StoreError::Io("connection refused".to_string())),
            Fault::Panic => panic!("store exploded"),
        }
    }
}

#[async_trait]
impl HistoryStore for FaultyStore {
    async fn insert_history(&self, _record: History) -> Result<(), StoreError> {
        self.fail()
    }

    async fn find_history(&self, _user: &UserId, _limit: usize) -> Result<Vec<History>, StoreError> {
        self.fail()
    }

    async fn get_history(&self, _id: &RecordId) -> Result<Option<History>, StoreError> {
        self.fail()
    }

    async fn delete_history(&self, _id: &RecordId) -> Result<bool, StoreError> {
        self.fail()
    }
}

#[async_trait]
impl UserStore for FaultyStore {
    async fn insert_user(&self, _user: User) -> Result<(), StoreError> {
        self.fail()
    }

    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        self.fail()
    }

    async fn find_user(&self, _id: &UserId) -> Result<Option<User>, StoreError> {
        self.fail()
    }
}

pub fn faulty_router(fault: Fault) -> Router {
    create_router(FaultyStore(fault), test_config())
}
