//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     /api/auth/*            /api/facedetect/*        /, /health  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (tokens)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └───────────────────────────┬─────────────────────────────────────┘
//!                             │
//!             HistoryService / AccountService
//!                             │
//!                   HistoryStore + UserStore
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{auth_middleware, bearer_token, AuthError, Caller, TokenAuth, DEFAULT_TOKEN_TTL};
pub use handlers::{
    AppState, DetectResponse, ErrorResponse, HealthResponse, HistoryResponse, LoginResponse,
    MessageResponse, RegisterResponse, ROOT_MESSAGE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_BODY_LIMIT};
