//! Persistence layer.
//!
//! Detection-history records and user accounts live in a document store.
//! Services are generic over the [`HistoryStore`] and [`UserStore`] traits so
//! that storage backends can be swapped without touching request handling.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   HistoryService / AccountService       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     HistoryStore + UserStore traits     │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  MemoryStore    │    │     FileStore       │
//! │  (in-process)   │    │ (JSON per document) │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! Backends are chosen from a connection string with [`open_store`]:
//!
//! - `memory://` keeps everything in process memory
//! - `file://<path>` (or a bare path) persists documents under `<path>`

mod file;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::account::User;
use crate::error::StoreError;
use crate::history::History;
use crate::ids::{RecordId, UserId};

pub use file::FileStore;
pub use memory::MemoryStore;

// =============================================================================
// Store Traits
// =============================================================================

/// Storage for detection-history records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a new record.
    async fn insert_history(&self, record: History) -> Result<(), StoreError>;

    /// Records owned by `user`, newest first, at most `limit` of them.
    ///
    /// Records sharing a creation timestamp are ordered by insertion, most
    /// recent first.
    async fn find_history(&self, user: &UserId, limit: usize) -> Result<Vec<History>, StoreError>;

    /// Look up a single record.
    async fn get_history(&self, id: &RecordId) -> Result<Option<History>, StoreError>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete_history(&self, id: &RecordId) -> Result<bool, StoreError>;
}

/// Storage for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user. Fails with [`StoreError::Duplicate`] when the email
    /// is already registered.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// Look up a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Look up a user by identifier.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
}

// =============================================================================
// Backend Selection
// =============================================================================

/// A store opened from a connection string.
#[derive(Clone)]
pub enum DocumentStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl DocumentStore {
    /// Short backend name for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            DocumentStore::Memory(_) => "memory",
            DocumentStore::File(_) => "file",
        }
    }
}

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Directory(PathBuf),
}

/// Parse a database connection string.
///
/// Accepts `memory://`, `file://<path>` (relative or absolute) and bare
/// filesystem paths. Any other scheme is rejected.
pub fn parse_database_url(url: &str) -> Result<StoreLocation, StoreError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StoreError::UnsupportedUrl("empty database URL".to_string()));
    }

    if let Some(rest) = url.strip_prefix("memory:") {
        if rest.is_empty() || rest == "//" {
            return Ok(StoreLocation::Memory);
        }
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    }

    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(StoreError::UnsupportedUrl(url.to_string()));
        }
        return Ok(StoreLocation::Directory(PathBuf::from(path)));
    }

    if url.contains("://") {
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    }

    Ok(StoreLocation::Directory(PathBuf::from(url)))
}

/// Open the store named by `url`.
pub async fn open_store(url: &str) -> Result<DocumentStore, StoreError> {
    match parse_database_url(url)? {
        StoreLocation::Memory => Ok(DocumentStore::Memory(MemoryStore::new())),
        StoreLocation::Directory(path) => Ok(DocumentStore::File(FileStore::open(path).await?)),
    }
}

#[async_trait]
impl HistoryStore for DocumentStore {
    async fn insert_history(&self, record: History) -> Result<(), StoreError> {
        match self {
            DocumentStore::Memory(s) => s.insert_history(record).await,
            DocumentStore::File(s) => s.insert_history(record).await,
        }
    }

    async fn find_history(&self, user: &UserId, limit: usize) -> Result<Vec<History>, StoreError> {
        match self {
            DocumentStore::Memory(s) => s.find_history(user, limit).await,
            DocumentStore::File(s) => s.find_history(user, limit).await,
        }
    }

    async fn get_history(&self, id: &RecordId) -> Result<Option<History>, StoreError> {
        match self {
            DocumentStore::Memory(s) => s.get_history(id).await,
            DocumentStore::File(s) => s.get_history(id).await,
        }
    }

    async fn delete_history(&self, id: &RecordId) -> Result<bool, StoreError> {
        match self {
            DocumentStore::Memory(s) => s.delete_history(id).await,
            DocumentStore::File(s) => s.delete_history(id).await,
        }
    }
}

#[async_trait]
impl UserStore for DocumentStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        match self {
            DocumentStore::Memory(s) => s.insert_user(user).await,
            DocumentStore::File(s) => s.insert_user(user).await,
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self {
            DocumentStore::Memory(s) => s.find_user_by_email(email).await,
            DocumentStore::File(s) => s.find_user_by_email(email).await,
        }
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        match self {
            DocumentStore::Memory(s) => s.find_user(id).await,
            DocumentStore::File(s) => s.find_user(id).await,
        }
    }
}
