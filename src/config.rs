//! Configuration management for the face detection API.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `FACEDETECT_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` - Run the HTTP API
//! - `detect` - Detect faces in an image file and save the result
//! - `history` - List saved detections
//! - `delete` - Delete a saved detection
//! - `check` - Probe the detection service and the API
//!
//! # Environment Variables
//!
//! - `FACEDETECT_HOST` - Server bind address (default: 0.0.0.0)
//! - `FACEDETECT_PORT` - Server port (default: 5001)
//! - `FACEDETECT_DATABASE_URL` - Store location (default: file://data/face-detection-app)
//! - `FACEDETECT_AUTH_SECRET` - HMAC secret for bearer tokens (required)
//! - `FACEDETECT_TOKEN_TTL` - Token lifetime in seconds (default: 604800)
//! - `FACEDETECT_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `FACEDETECT_BODY_LIMIT` - Maximum request body in bytes (default: 52428800)
//! - `FACEDETECT_HISTORY_POLICY` - `open` or `owner` (default: open)
//! - `FACEDETECT_API_URL` - History API for client commands (default: http://localhost:5001)
//! - `FACEDETECT_DETECTOR_URL` - Detection service (default: http://localhost:5000)
//! - `FACEDETECT_EMAIL` / `FACEDETECT_PASSWORD` - Credentials for client commands

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::client::{DEFAULT_API_URL, DEFAULT_DETECTOR_URL};
use crate::history::ListPolicy;
use crate::server::DEFAULT_BODY_LIMIT;
use crate::store::parse_database_url;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default store location.
pub const DEFAULT_DATABASE_URL: &str = "file://data/face-detection-app";

/// Default token lifetime in seconds (7 days).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Shortest accepted auth secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Longest accepted token lifetime in seconds (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Face Detection API - detection history service and client.
#[derive(Parser, Debug, Clone)]
#[command(name = "facedetect-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(ServeConfig),

    /// Detect faces in an image file and save the result.
    Detect(DetectConfig),

    /// List saved detections.
    History(HistoryConfig),

    /// Delete a saved detection.
    Delete(DeleteConfig),

    /// Check that the detection service and the API are reachable.
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FACEDETECT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FACEDETECT_PORT")]
    pub port: u16,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "FACEDETECT_BODY_LIMIT")]
    pub body_limit: usize,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Store location: `memory://`, `file://<dir>` or a directory path.
    #[arg(long, default_value = DEFAULT_DATABASE_URL, env = "FACEDETECT_DATABASE_URL")]
    pub database_url: String,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for signing bearer tokens.
    #[arg(long, env = "FACEDETECT_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Lifetime of issued tokens in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "FACEDETECT_TOKEN_TTL")]
    pub token_ttl: u64,

    /// Who may list a user's history: `open` (any authenticated caller) or `owner`.
    #[arg(long, default_value = "open", env = "FACEDETECT_HISTORY_POLICY")]
    pub history_policy: ListPolicy,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FACEDETECT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.auth_secret.as_deref() {
            None | Some("") => {
                return Err(
                    "No auth secret provided. Set --auth-secret or FACEDETECT_AUTH_SECRET"
                        .to_string(),
                );
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "auth secret must be at least {} characters",
                    MIN_SECRET_LEN
                ));
            }
            Some(_) => {}
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }

        if self.token_ttl > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "token_ttl must be at most {} seconds",
                MAX_TOKEN_TTL_SECS
            ));
        }

        if self.body_limit == 0 {
            return Err("body_limit must be greater than 0".to_string());
        }

        parse_database_url(&self.database_url).map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the auth secret, or an empty string (call validate() first).
    pub fn auth_secret_or_empty(&self) -> &str {
        self.auth_secret.as_deref().unwrap_or("")
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }
}

// =============================================================================
// Client Commands
// =============================================================================

/// Connection and credential options shared by the client commands.
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the history API.
    #[arg(long, default_value = DEFAULT_API_URL, env = "FACEDETECT_API_URL")]
    pub api_url: String,

    /// Account email.
    #[arg(long, env = "FACEDETECT_EMAIL")]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, env = "FACEDETECT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ClientArgs {
    /// Email and password, or a message naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str), String> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Ok((email, password))
            }
            _ => Err(
                "Credentials required. Set --email/--password or FACEDETECT_EMAIL/FACEDETECT_PASSWORD"
                    .to_string(),
            ),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DetectConfig {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Base URL of the detection service.
    #[arg(long, default_value = DEFAULT_DETECTOR_URL, env = "FACEDETECT_DETECTOR_URL")]
    pub detector_url: String,

    /// Image file to upload.
    #[arg(short, long)]
    pub image: PathBuf,

    /// Register the account before logging in, using this display name.
    #[arg(long)]
    pub register_as: Option<String>,
}

impl DetectConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.client.credentials()?;
        if !self.image.is_file() {
            return Err(format!("Image not found: {}", self.image.display()));
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct HistoryConfig {
    #[command(flatten)]
    pub client: ClientArgs,

    /// User whose history to list (defaults to the logged-in user).
    #[arg(long)]
    pub user: Option<String>,

    /// Print full records as JSON, including images.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteConfig {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Identifier of the detection to delete.
    pub detection_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Base URL of the history API.
    #[arg(long, default_value = DEFAULT_API_URL, env = "FACEDETECT_API_URL")]
    pub api_url: String,

    /// Base URL of the detection service.
    #[arg(long, default_value = DEFAULT_DETECTOR_URL, env = "FACEDETECT_DETECTOR_URL")]
    pub detector_url: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
