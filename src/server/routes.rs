//! Router configuration for the face detection history API.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS, body limits and panic recovery.
//!
//! # Route Structure
//!
//! ```text
//! /                                         - Liveness (public)
//! /health                                   - Health check (public)
//! /api/auth/register                        - Register (public)
//! /api/auth/login                           - Login (public)
//! /api/facedetect/detect                    - Save detection (bearer token)
//! /api/facedetect/history/{user_id}         - List history (bearer token)
//! /api/facedetect/delete/{detection_id}     - Delete detection (bearer token)
//! *                                         - JSON 404
//! ```
//!
//! # Example
//!
//! ```ignore
//! use facedetect_api::server::routes::{create_router, RouterConfig};
//! use facedetect_api::store::MemoryStore;
//!
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(MemoryStore::new(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5001").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, TokenAuth, DEFAULT_TOKEN_TTL};
use super::handlers::{
    delete_handler, detect_handler, health_handler, history_handler, login_handler,
    not_found_handler, panic_response, register_handler, root_handler, AppState,
};
use crate::account::{AccountService, DEFAULT_ITERATIONS};
use crate::history::{HistoryService, ListPolicy};
use crate::store::{HistoryStore, UserStore};

/// Default maximum request body size (50 MiB); detections carry base64 images.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for signing bearer tokens
    pub auth_secret: String,

    /// Lifetime of tokens issued at login
    pub token_ttl: Duration,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum request body size in bytes
    pub body_limit: usize,

    /// Who may list another user's history
    pub list_policy: ListPolicy,

    /// PBKDF2 iterations for new password hashes
    pub password_iterations: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given token secret.
    ///
    /// By default:
    /// - Tokens live for 7 days
    /// - CORS allows any origin
    /// - Bodies up to 50 MiB are accepted
    /// - Any authenticated user may list any history
    /// - Tracing is enabled
    pub fn new(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            cors_origins: None,
            body_limit: DEFAULT_BODY_LIMIT,
            list_policy: ListPolicy::default(),
            password_iterations: DEFAULT_ITERATIONS,
            enable_tracing: true,
        }
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the maximum request body size in bytes.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Set the history listing policy.
    pub fn with_list_policy(mut self, policy: ListPolicy) -> Self {
        self.list_policy = policy;
        self
    }

    /// Set the PBKDF2 iteration count for new accounts.
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Both services share `store`. The history routes sit behind the bearer
/// token middleware; unmatched paths (including under `/api/facedetect`)
/// fall through to a JSON 404 without an authentication check.
pub fn create_router<S>(store: S, config: RouterConfig) -> Router
where
    S: HistoryStore + UserStore + Clone + 'static,
{
    let auth = TokenAuth::new(&config.auth_secret).with_ttl(config.token_ttl);

    let history = HistoryService::new(store.clone()).with_list_policy(config.list_policy);
    let accounts = AccountService::with_iterations(store, config.password_iterations);
    let app_state = AppState::new(history, accounts, auth.clone());

    let cors = build_cors_layer(&config);

    let facedetect_routes = Router::new()
        .route("/detect", post(detect_handler::<S>))
        .route("/history/{user_id}", get(history_handler::<S>))
        .route("/delete/{detection_id}", delete(delete_handler::<S>))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(app_state.clone());

    let auth_routes = Router::new()
        .route("/register", post(register_handler::<S>))
        .route("/login", post(login_handler::<S>))
        .with_state(app_state);

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/facedetect", facedetect_routes)
        .nest("/api/auth", auth_routes)
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
