//! In-process document store.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::account::User;
use crate::error::StoreError;
use crate::history::History;
use crate::ids::{RecordId, UserId};

use super::{HistoryStore, UserStore};

/// A history record together with its insertion sequence number.
struct StoredHistory {
    seq: u64,
    record: History,
}

#[derive(Default)]
struct Collections {
    history: HashMap<RecordId, StoredHistory>,
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    next_seq: u64,
}

/// Document store held entirely in memory.
///
/// Cloning yields another handle to the same collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored history records.
    pub async fn history_len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    /// Number of registered users.
    pub async fn user_len(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn insert_history(&self, record: History) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.history.insert(record.id, StoredHistory { seq, record });
        Ok(())
    }

    async fn find_history(&self, user: &UserId, limit: usize) -> Result<Vec<History>, StoreError> {
        let inner = self.inner.read().await;

        let mut owned: Vec<&StoredHistory> = inner
            .history
            .values()
            .filter(|stored| stored.record.user_id == *user)
            .collect();
        owned.sort_by_key(|stored| Reverse((stored.record.created_at, stored.seq)));

        Ok(owned
            .into_iter()
            .take(limit)
            .map(|stored| stored.record.clone())
            .collect())
    }

    async fn get_history(&self, id: &RecordId) -> Result<Option<History>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.history.get(id).map(|stored| stored.record.clone()))
    }

    async fn delete_history(&self, id: &RecordId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.history.remove(id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&user.email) {
            return Err(StoreError::Duplicate {
                collection: "users",
                key: user.email,
            });
        }
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }
}
