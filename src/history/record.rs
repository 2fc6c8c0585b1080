//! Detection-history record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RecordId, UserId};

/// Detector label stored when the submitter does not name one.
pub const DEFAULT_DETECTION_METHOD: &str = "face-api.js";

/// Maximum number of records returned by a history listing.
pub const HISTORY_LIMIT: usize = 50;

/// A bounding box reported by the external detector.
///
/// Coordinates are kept as `f64` so values submitted by the client come back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Detector confidence for this box, when the detector reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Whether eyes were found inside the box (detector spelling is `has_eyes`)
    #[serde(default, alias = "has_eyes", skip_serializing_if = "Option::is_none")]
    pub has_eyes: Option<bool>,
}

impl FaceBox {
    /// Create a box without confidence or eye information.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: None,
            has_eyes: None,
        }
    }

    /// Attach a confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// One completed detection event.
///
/// Records are immutable once created; the only lifecycle transition after
/// creation is deletion by the owner. `faces_detected` and the length of
/// `face_coordinates` are stored as submitted and need not agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub id: RecordId,
    pub user_id: UserId,
    pub original_image: String,
    pub result_image: String,
    pub faces_detected: u32,
    pub face_coordinates: Vec<FaceBox>,
    pub detection_method: String,
    pub created_at: DateTime<Utc>,
}

/// Body of a detection submission.
///
/// Every field is optional at the parsing level so that absent images are
/// reported as validation errors by the service instead of deserializer
/// rejections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_detected: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_coordinates: Option<Vec<FaceBox>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<String>,
}

impl NewDetection {
    /// Create a submission with both images set.
    pub fn new(original_image: impl Into<String>, result_image: impl Into<String>) -> Self {
        Self {
            original_image: Some(original_image.into()),
            result_image: Some(result_image.into()),
            ..Self::default()
        }
    }

    /// Set the reported face count.
    pub fn with_faces_detected(mut self, count: u32) -> Self {
        self.faces_detected = Some(count);
        self
    }

    /// Set the bounding boxes.
    pub fn with_face_coordinates(mut self, boxes: Vec<FaceBox>) -> Self {
        self.face_coordinates = Some(boxes);
        self
    }

    /// Set the detector label.
    pub fn with_detection_method(mut self, method: impl Into<String>) -> Self {
        self.detection_method = Some(method.into());
        self
    }
}
