//! Bearer token authentication.
//!
//! Tokens are issued at login and bind a user identifier to an expiry time
//! with an HMAC-SHA256 signature:
//!
//! ```text
//! token     = "{user_id}.{expiry}.{signature}"
//! signature = hex(HMAC-SHA256(secret_key, "{user_id}.{expiry}"))
//! ```
//!
//! Clients send them as `Authorization: Bearer <token>`. The
//! [`auth_middleware`] verifies the token and attaches a [`Caller`] to the
//! request; handlers read it back with the [`Caller`] extractor.
//!
//! # Security Properties
//!
//! - **Identity binding**: the user id is covered by the signature, so it cannot be swapped
//! - **Time-limited**: tokens expire after a configurable TTL
//! - **Constant-time comparison**: signature verification uses constant-time comparison
//!
//! # Example
//!
//! ```rust
//! use facedetect_api::server::auth::TokenAuth;
//! use facedetect_api::UserId;
//!
//! let auth = TokenAuth::new("my-secret-key");
//! let user = UserId::new();
//!
//! let (token, _expiry) = auth.issue(&user);
//! assert_eq!(auth.verify(&token).unwrap(), user);
//! ```

use std::convert::Infallible;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::ids::UserId;

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime (7 days).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Authentication error types.
///
/// Every variant is reported as `401 Unauthorized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header
    MissingToken,

    /// Header present but not `Bearer <token>`
    MalformedHeader,

    /// Token does not have the `{user}.{expiry}.{signature}` shape
    MalformedToken,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token"),
            AuthError::MalformedHeader => write!(f, "Authorization header must be 'Bearer <token>'"),
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::Expired { .. } => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let error_type = self.error_type();
        let message = self.to_string();

        // A bad signature may be tampering; everything else is routine
        match &self {
            AuthError::InvalidSignature => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Token Authentication
// =============================================================================

/// Issues and verifies HMAC-SHA256 bearer tokens.
#[derive(Clone)]
pub struct TokenAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,

    /// Lifetime of newly issued tokens
    ttl: Duration,
}

impl TokenAuth {
    /// Create an authenticator with the default TTL.
    ///
    /// The secret should be at least 32 bytes for security.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Set the lifetime of issued tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user`.
    ///
    /// Returns the token and its expiry (Unix epoch seconds).
    pub fn issue(&self, user: &UserId) -> (String, u64) {
        let expiry = now_secs().saturating_add(self.ttl.as_secs());
        (self.issue_with_expiry(user, expiry), expiry)
    }

    /// Issue a token with an explicit expiry timestamp.
    pub fn issue_with_expiry(&self, user: &UserId, expiry: u64) -> String {
        let payload = format!("{}.{}", user, expiry);
        let signature = self.compute_signature(&payload);
        format!("{}.{}", payload, signature)
    }

    /// Verify a token and return the user it was issued for.
    ///
    /// Checks shape, then expiry, then the signature in constant time.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let mut parts = token.trim().split('.');
        let (Some(user), Some(expiry), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken);
        };

        let user_id: UserId = user.parse().map_err(|_| AuthError::MalformedToken)?;
        let expiry: u64 = expiry.parse().map_err(|_| AuthError::MalformedToken)?;
        let provided_sig = hex::decode(signature).map_err(|_| AuthError::MalformedToken)?;

        let current_time = now_secs();
        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        // Sign the payload exactly as received so re-encoded ids do not verify
        let expected_sig = self.compute_raw_signature(&format!("{}.{}", user, expiry));
        if provided_sig.ct_eq(&expected_sig).into() {
            Ok(user_id)
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    fn compute_raw_signature(&self, payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn compute_signature(&self, payload: &str) -> String {
        hex::encode(self.compute_raw_signature(payload))
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// Caller Identity
// =============================================================================

/// The authenticated user making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or(AuthError::MissingToken)
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().copied())
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware that verifies the bearer token.
///
/// On success the verified [`Caller`] is inserted into the request
/// extensions; otherwise the request is rejected with `401` before it reaches
/// the handler.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::post};
/// use facedetect_api::server::auth::{TokenAuth, auth_middleware};
///
/// let auth = TokenAuth::new("secret-key");
/// let app = Router::new()
///     .route("/detect", post(detect_handler))
///     .route_layer(middleware::from_fn_with_state(auth, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(auth): State<TokenAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
    let token = bearer_token(header).ok_or(AuthError::MalformedHeader)?;

    let user_id = auth.verify(token)?;
    request.extensions_mut().insert(Caller { user_id });

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
