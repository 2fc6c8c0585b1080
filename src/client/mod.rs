//! Client-side orchestration.
//!
//! Ties the external detection service to the history API:
//!
//! ```text
//!   ImageSource ──► DetectorClient ──► FaceDetection ──► ApiClient ──► History
//!   (webcam/file)   POST /detect-faces                  POST /api/facedetect/detect
//! ```
//!
//! [`Workflow`] holds the explicit state (service status, capture mode,
//! detection phase) and the [`Session`] used for every authenticated call.

mod api;
mod detector;
mod session;
mod workflow;

pub use api::{ApiClient, DEFAULT_API_URL};
pub use detector::{DetectorClient, DetectorResponse, FaceDetection, DEFAULT_DETECTOR_URL};
pub use session::Session;
pub use workflow::{
    encode_data_uri, mime_for_path, CaptureMode, DetectionPhase, ImageSource, ServiceStatus,
    Workflow,
};
