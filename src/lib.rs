//! # Face Detection API
//!
//! A detection-history service for a face detection app, plus the client
//! that drives the external detection service and saves its results.
//!
//! Users register and log in to obtain a bearer token. Each completed
//! detection (the submitted image, the annotated result image and the face
//! boxes) is saved as a [`History`] record that only its owner may delete.
//!
//! ## Features
//!
//! - **History API**: create, list (newest first, capped at 50) and delete detections
//! - **Authentication**: PBKDF2 password hashes and HMAC-SHA256 signed bearer tokens
//! - **Pluggable storage**: in-memory or JSON documents on disk
//! - **Client workflow**: liveness probe, capture/upload modes, detect then save
//!
//! ## Architecture
//!
//! - [`history`] - History records, ownership policy and service
//! - [`account`] - Users, password hashing, registration and login
//! - [`store`] - Persistence traits with memory and file backends
//! - [`server`] - Axum-based HTTP server and routes
//! - [`client`] - Detection service and API clients, detection workflow
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use facedetect_api::{create_router, open_store, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = open_store("memory://").await?;
//!     let router = create_router(store, RouterConfig::new("a-long-random-secret"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5001").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod ids;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use account::{AccountService, LoginRequest, RegisterRequest, User, UserProfile};
pub use client::{
    ApiClient, CaptureMode, DetectionPhase, DetectorClient, FaceDetection, ImageSource,
    ServiceStatus, Session, Workflow,
};
pub use config::{CheckConfig, Cli, Command, DetectConfig, HistoryConfig, ServeConfig};
pub use error::{AccountError, ClientError, HistoryError, StoreError};
pub use history::{
    can_delete, FaceBox, History, HistoryService, ListPolicy, NewDetection,
    DEFAULT_DETECTION_METHOD, HISTORY_LIMIT,
};
pub use ids::{RecordId, UserId};
pub use server::{
    auth_middleware, create_router, AppState, AuthError, Caller, ErrorResponse, RouterConfig,
    TokenAuth,
};
pub use store::{open_store, DocumentStore, FileStore, HistoryStore, MemoryStore, UserStore};
