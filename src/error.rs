use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading or writing a stored document failed
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// A stored document could not be encoded or decoded
    #[error("Corrupt document {path}: {message}")]
    Corrupt { path: String, message: String },

    /// A unique key is already taken
    #[error("Duplicate {collection} key: {key}")]
    Duplicate {
        collection: &'static str,
        key: String,
    },

    /// The connection string names a backend we cannot open
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors produced by the detection-history operations
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    /// Required input is absent or malformed (maps to HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Caller is authenticated but may not act on the record (maps to HTTP 403)
    #[error("{0}")]
    Forbidden(String),

    /// No record with the given identifier exists (maps to HTTP 404)
    #[error("Detection not found: {0}")]
    NotFound(String),

    /// Persistence failure (maps to HTTP 500)
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors produced by registration and login
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    /// Required field missing or empty
    #[error("{0}")]
    Validation(String),

    /// An account already exists for this email
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The password hashing task failed to complete
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Persistence failure
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { key, .. } => AccountError::UserExists(key),
            other => AccountError::Store(other),
        }
    }
}

/// Errors raised by the client-side orchestration
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure talking to the API or the detector
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The detection-history API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The external detection service reported a failure
    #[error("Detection service error: {0}")]
    Detector(String),

    /// A local image could not be read for upload
    #[error("Cannot read image {path}: {message}")]
    Image { path: String, message: String },

    /// A base URL could not be parsed or joined
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The workflow is not in a state that allows the requested action
    #[error("{0}")]
    State(String),
}
