//! HTTP request handlers for the face detection history API.
//!
//! # Endpoints
//!
//! - `GET /` - Liveness message
//! - `GET /health` - Health check with version
//! - `POST /api/auth/register` - Create an account
//! - `POST /api/auth/login` - Exchange credentials for a bearer token
//! - `POST /api/facedetect/detect` - Save a detection (authenticated)
//! - `GET /api/facedetect/history/{user_id}` - List a user's detections (authenticated)
//! - `DELETE /api/facedetect/delete/{detection_id}` - Delete an owned detection (authenticated)

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::account::{AccountService, LoginRequest, RegisterRequest, UserProfile};
use crate::error::{AccountError, HistoryError};
use crate::history::{History, HistoryService, NewDetection};
use crate::ids::{RecordId, UserId};
use crate::store::{HistoryStore, UserStore};

use super::auth::{Caller, TokenAuth};

/// Message returned by `GET /`.
pub const ROOT_MESSAGE: &str = "Face Detection API is running";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: HistoryStore + UserStore> {
    /// History create / list / delete
    pub history: Arc<HistoryService<S>>,

    /// Registration and login
    pub accounts: Arc<AccountService<S>>,

    /// Issues tokens at login
    pub auth: TokenAuth,
}

impl<S: HistoryStore + UserStore> AppState<S> {
    /// Create a new application state sharing one store between both services.
    pub fn new(history: HistoryService<S>, accounts: AccountService<S>, auth: TokenAuth) -> Self {
        Self {
            history: Arc::new(history),
            accounts: Arc::new(accounts),
            auth,
        }
    }
}

impl<S: HistoryStore + UserStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            history: Arc::clone(&self.history),
            accounts: Arc::clone(&self.accounts),
            auth: self.auth.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response to a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Response to a successful login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,

    /// Bearer token for the `Authorization` header
    pub token: String,

    /// Token expiry (Unix epoch seconds)
    pub expires_at: u64,

    pub user: UserProfile,
}

/// Response to a saved detection.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub message: String,
    pub detection: History,
}

/// Response from the history listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Number of records in `history`
    pub count: usize,

    /// Records, newest first
    pub history: Vec<History>,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Request rejected: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

/// Convert HistoryError to HTTP response.
///
/// 5xx errors are logged at ERROR, 401 and 404 at DEBUG and other client
/// errors at WARN. Storage failures carry the raw error text in `message`.
impl IntoResponse for HistoryError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            HistoryError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            HistoryError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            HistoryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            HistoryError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AccountError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AccountError::UserExists(_) => (StatusCode::BAD_REQUEST, "user_exists"),
            AccountError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AccountError::Hashing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AccountError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        error_response(status, error_type, self.to_string())
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// JSON body extractor whose rejections use [`ErrorResponse`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(BodyRejection))]
pub struct JsonBody<T>(pub T);

/// A request body that could not be read as JSON.
///
/// Oversized bodies keep `413`; every other failure (malformed JSON, wrong
/// content type, wrong field types) is a `400`.
#[derive(Debug)]
pub struct BodyRejection {
    status: StatusCode,
    message: String,
}

impl From<JsonRejection> for BodyRejection {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let error_type = if self.status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "invalid_body"
        };
        error_response(self.status, error_type, self.message)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness probe.
///
/// `GET /` always answers `200 OK` with
/// `{"message": "Face Detection API is running"}`.
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create an account.
///
/// # Endpoint
///
/// `POST /api/auth/register` with `{"name", "email", "password"}`
///
/// # Errors
///
/// - `400 Bad Request`: missing field, malformed body or email already registered
pub async fn register_handler<S>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AccountError>
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let user = state.accounts.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: user.profile(),
        }),
    ))
}

/// Exchange credentials for a bearer token.
///
/// # Endpoint
///
/// `POST /api/auth/login` with `{"email", "password"}`
///
/// # Errors
///
/// - `400 Bad Request`: missing field or malformed body
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login_handler<S>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AccountError>
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let user = state.accounts.login(request).await?;
    let (token, expires_at) = state.auth.issue(&user.id);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        expires_at,
        user: user.profile(),
    }))
}

/// Save a completed detection for the caller.
///
/// # Endpoint
///
/// `POST /api/facedetect/detect`
///
/// # Request
///
/// ```json
/// {
///   "originalImage": "data:image/jpeg;base64,...",
///   "resultImage": "data:image/jpeg;base64,...",
///   "facesDetected": 2,
///   "faceCoordinates": [{"x": 10, "y": 20, "width": 64, "height": 64}],
///   "detectionMethod": "face-api.js"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"message": "Face detection saved", "detection": {...}}`
///
/// # Errors
///
/// - `400 Bad Request`: missing image, no caller identity or malformed body
/// - `413 Payload Too Large`: body over the configured limit
/// - `500 Internal Server Error`: storage failure
pub async fn detect_handler<S>(
    State(state): State<AppState<S>>,
    caller: Option<Caller>,
    JsonBody(detection): JsonBody<NewDetection>,
) -> Result<(StatusCode, Json<DetectResponse>), HistoryError>
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let record = state
        .history
        .submit_detection(caller.map(|c| c.user_id), detection)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DetectResponse {
            message: "Face detection saved".to_string(),
            detection: record,
        }),
    ))
}

/// List the most recent detections of a user.
///
/// # Endpoint
///
/// `GET /api/facedetect/history/{user_id}`
///
/// # Response
///
/// `200 OK` with `{"count": n, "history": [...]}`, newest first, at most 50.
///
/// # Errors
///
/// - `400 Bad Request`: `user_id` is not a valid identifier
/// - `403 Forbidden`: listing another user's history under the owner-only policy
/// - `500 Internal Server Error`: storage failure
pub async fn history_handler<S>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, HistoryError>
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let target: UserId = user_id
        .parse()
        .map_err(|_| HistoryError::Validation(format!("Invalid user id: {}", user_id)))?;

    let history = state.history.list_history(&caller.user_id, &target).await?;

    Ok(Json(HistoryResponse {
        count: history.len(),
        history,
    }))
}

/// Delete a detection owned by the caller.
///
/// # Endpoint
///
/// `DELETE /api/facedetect/delete/{detection_id}`
///
/// # Errors
///
/// - `403 Forbidden`: the record belongs to another user
/// - `404 Not Found`: no such record (including malformed identifiers)
/// - `500 Internal Server Error`: storage failure
pub async fn delete_handler<S>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(detection_id): Path<String>,
) -> Result<Json<MessageResponse>, HistoryError>
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let id: RecordId = detection_id
        .parse()
        .map_err(|_| HistoryError::NotFound(detection_id.clone()))?;

    state.history.delete_detection(&caller.user_id, &id).await?;

    Ok(Json(MessageResponse {
        message: "Detection deleted successfully".to_string(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "not_found",
        "Route not found".to_string(),
    )
}

/// Turn a handler panic into a JSON `500`.
///
/// Installed with `CatchPanicLayer::custom`; the panic payload is logged and
/// returned as the message.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

// =============================================================================
// Tests
// =============================================================================
