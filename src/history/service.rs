//! Detection-history operations.
//!
//! [`HistoryService`] implements the three operations exposed under
//! `/api/facedetect`: create, list and delete. Each performs a single store
//! round trip, except delete which reads the record for the ownership check
//! before removing it.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::HistoryError;
use crate::ids::{RecordId, UserId};
use crate::store::HistoryStore;

use super::policy::{can_delete, ListPolicy};
use super::record::{History, NewDetection, DEFAULT_DETECTION_METHOD, HISTORY_LIMIT};

/// History operations over a [`HistoryStore`].
pub struct HistoryService<S: HistoryStore> {
    store: S,
    list_policy: ListPolicy,
    limit: usize,
}

impl<S: HistoryStore> HistoryService<S> {
    /// Create a service with the open listing policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            list_policy: ListPolicy::default(),
            limit: HISTORY_LIMIT,
        }
    }

    /// Set who may list a user's history.
    pub fn with_list_policy(mut self, policy: ListPolicy) -> Self {
        self.list_policy = policy;
        self
    }

    /// The listing policy in effect.
    pub fn list_policy(&self) -> ListPolicy {
        self.list_policy
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new detection for `caller`.
    ///
    /// Fails with [`HistoryError::Validation`] when the caller identity or
    /// either image is absent (an empty string counts as absent). The face
    /// count defaults to 0, the coordinates to an empty list and the method to
    /// [`DEFAULT_DETECTION_METHOD`]; the count is not checked against the
    /// number of boxes.
    pub async fn submit_detection(
        &self,
        caller: Option<UserId>,
        detection: NewDetection,
    ) -> Result<History, HistoryError> {
        let original_image = detection.original_image.filter(|s| !s.is_empty());
        let result_image = detection.result_image.filter(|s| !s.is_empty());

        let (Some(user_id), Some(original_image), Some(result_image)) =
            (caller, original_image, result_image)
        else {
            return Err(HistoryError::Validation(
                "Missing required fields".to_string(),
            ));
        };

        let record = History {
            id: RecordId::new(),
            user_id,
            original_image,
            result_image,
            faces_detected: detection.faces_detected.unwrap_or(0),
            face_coordinates: detection.face_coordinates.unwrap_or_default(),
            detection_method: detection
                .detection_method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DETECTION_METHOD.to_string()),
            created_at: Utc::now(),
        };

        self.store.insert_history(record.clone()).await?;

        info!(
            record_id = %record.id,
            user_id = %record.user_id,
            faces = record.faces_detected,
            "Saved detection"
        );

        Ok(record)
    }

    /// The most recent detections of `target`, newest first.
    ///
    /// Returns at most [`HISTORY_LIMIT`] records and an empty list when the
    /// user has none. Under [`ListPolicy::OwnerOnly`] a caller other than the
    /// target is rejected with [`HistoryError::Forbidden`].
    pub async fn list_history(
        &self,
        caller: &UserId,
        target: &UserId,
    ) -> Result<Vec<History>, HistoryError> {
        if !self.list_policy.allows(caller, target) {
            warn!(caller = %caller, target = %target, "History listing refused by policy");
            return Err(HistoryError::Forbidden(
                "Not allowed to view this user's history".to_string(),
            ));
        }

        let records = self.store.find_history(target, self.limit).await?;
        debug!(target = %target, count = records.len(), "Listed history");
        Ok(records)
    }

    /// Delete a detection owned by `caller`.
    ///
    /// Fails with [`HistoryError::NotFound`] when no such record exists and
    /// with [`HistoryError::Forbidden`] when it belongs to someone else. A
    /// record removed concurrently between the lookup and the delete is
    /// reported as not found.
    pub async fn delete_detection(
        &self,
        caller: &UserId,
        id: &RecordId,
    ) -> Result<(), HistoryError> {
        let Some(record) = self.store.get_history(id).await? else {
            return Err(HistoryError::NotFound(id.to_string()));
        };

        if !can_delete(&record, caller) {
            warn!(record_id = %id, caller = %caller, "Delete refused: caller does not own record");
            return Err(HistoryError::Forbidden("Unauthorized".to_string()));
        }

        if !self.store.delete_history(id).await? {
            return Err(HistoryError::NotFound(id.to_string()));
        }

        info!(record_id = %id, user_id = %caller, "Deleted detection");
        Ok(())
    }
}
