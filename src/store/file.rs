//! Directory-backed document store.
//!
//! Each document is one JSON file:
//!
//! ```text
//! <root>/history/<record-id>.json
//! <root>/users/<user-id>.json
//! ```
//!
//! History documents are stored as `{"seq": n, "record": {...}}` so that
//! records sharing a creation timestamp keep their insertion order across
//! restarts.
//!
//! All documents are loaded into a [`MemoryStore`] index when the store is
//! opened. Mutations write through to disk before the index is updated, so
//! a failed write leaves the index unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::account::User;
use crate::error::StoreError;
use crate::history::History;
use crate::ids::{RecordId, UserId};

use super::memory::MemoryStore;
use super::{HistoryStore, UserStore};

const HISTORY_DIR: &str = "history";
const USERS_DIR: &str = "users";

/// On-disk form of a history record.
#[derive(Serialize, Deserialize)]
struct HistoryDocument {
    seq: u64,
    record: History,
}

/// Document store persisting one JSON file per document.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    index: MemoryStore,
    /// Serializes mutations so uniqueness checks and file writes do not
    /// interleave. Holds the next history sequence number.
    writes: Arc<Mutex<u64>>,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root` and load every
    /// document found there.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(HISTORY_DIR)).await?;
        fs::create_dir_all(root.join(USERS_DIR)).await?;

        let index = MemoryStore::new();

        let users: Vec<User> = load_documents(&root.join(USERS_DIR)).await?;
        let user_count = users.len();
        for user in users {
            index.insert_user(user).await?;
        }

        let mut history: Vec<HistoryDocument> = load_documents(&root.join(HISTORY_DIR)).await?;
        history.sort_by_key(|document| document.seq);
        let history_count = history.len();
        let next_seq = history.last().map_or(0, |document| document.seq + 1);
        for document in history {
            index.insert_history(document.record).await?;
        }

        info!(
            root = %root.display(),
            users = user_count,
            history = history_count,
            "Opened file store"
        );

        Ok(Self {
            root,
            index,
            writes: Arc::new(Mutex::new(next_seq)),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn history_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(HISTORY_DIR).join(format!("{}.json", id))
    }

    fn user_path(&self, id: &UserId) -> PathBuf {
        self.root.join(USERS_DIR).join(format!("{}.json", id))
    }
}

#[async_trait]
impl HistoryStore for FileStore {
    async fn insert_history(&self, record: History) -> Result<(), StoreError> {
        let mut next_seq = self.writes.lock().await;
        let document = HistoryDocument {
            seq: *next_seq,
            record,
        };
        write_document(&self.history_path(&document.record.id), &document).await?;
        *next_seq += 1;
        self.index.insert_history(document.record).await
    }

    async fn find_history(&self, user: &UserId, limit: usize) -> Result<Vec<History>, StoreError> {
        self.index.find_history(user, limit).await
    }

    async fn get_history(&self, id: &RecordId) -> Result<Option<History>, StoreError> {
        self.index.get_history(id).await
    }

    async fn delete_history(&self, id: &RecordId) -> Result<bool, StoreError> {
        let _guard = self.writes.lock().await;
        if self.index.get_history(id).await?.is_none() {
            return Ok(false);
        }

        match fs::remove_file(self.history_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(record_id = %id, "History document already gone from disk");
            }
            Err(e) => return Err(e.into()),
        }

        self.index.delete_history(id).await
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;
        if self.index.find_user_by_email(&user.email).await?.is_some() {
            return Err(StoreError::Duplicate {
                collection: "users",
                key: user.email,
            });
        }

        write_document(&self.user_path(&user.id), &user).await?;
        self.index.insert_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.index.find_user_by_email(email).await
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.index.find_user(id).await
    }
}

// =============================================================================
// Document I/O
// =============================================================================

/// Write a document atomically (temp file + rename).
async fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(document).map_err(|e| StoreError::Corrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read every `*.json` document in `dir`.
async fn load_documents<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    let mut documents = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let contents = fs::read(&path).await?;
        let document = serde_json::from_slice(&contents).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        documents.push(document);
    }

    Ok(documents)
}
