//! Capture / upload detection workflow.
//!
//! # State Machine
//!
//! ```text
//! service:   Checking ──probe──► Ready | Error        (probed once)
//!
//! mode:      Unset ──select──► Webcam | Upload
//!              ▲                   │
//!              └──────reset────────┘
//!
//! phase:     Idle ──run──► Detecting ──► ResultReady | Failed
//! ```
//!
//! Capture and upload are only available while the service is `Ready`. A
//! failed probe leaves the workflow in `Error`; nothing re-probes
//! automatically.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

use crate::error::ClientError;
use crate::history::History;

use super::api::ApiClient;
use super::detector::DetectorClient;
use super::session::Session;

// =============================================================================
// States
// =============================================================================

/// Reachability of the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Checking,
    Ready,
    Error,
}

/// How the next image is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Unset,
    Webcam,
    Upload,
}

/// Progress of the current detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionPhase {
    #[default]
    Idle,
    Detecting,
    ResultReady,
    Failed,
}

// =============================================================================
// Image Sources
// =============================================================================

/// An image to run detection on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A captured frame, already encoded as a data URI
    DataUri(String),

    /// A file chosen for upload
    File(PathBuf),
}

impl ImageSource {
    /// The capture mode this source belongs to.
    pub fn mode(&self) -> CaptureMode {
        match self {
            ImageSource::DataUri(_) => CaptureMode::Webcam,
            ImageSource::File(_) => CaptureMode::Upload,
        }
    }

    /// Encode the image as a data URI.
    pub async fn into_data_uri(self) -> Result<String, ClientError> {
        match self {
            ImageSource::DataUri(uri) => Ok(uri),
            ImageSource::File(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| ClientError::Image {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Ok(encode_data_uri(mime_for_path(&path), &bytes))
            }
        }
    }
}

/// MIME type for an image file, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// `data:{mime};base64,{payload}`
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

// =============================================================================
// Workflow
// =============================================================================

/// Drives detection for one logged-in user.
pub struct Workflow {
    detector: DetectorClient,
    api: ApiClient,
    session: Session,
    status: ServiceStatus,
    mode: CaptureMode,
    phase: DetectionPhase,
    last_result: Option<History>,
}

impl Workflow {
    pub fn new(detector: DetectorClient, api: ApiClient, session: Session) -> Self {
        Self {
            detector,
            api,
            session,
            status: ServiceStatus::Checking,
            mode: CaptureMode::Unset,
            phase: DetectionPhase::Idle,
            last_result: None,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn phase(&self) -> DetectionPhase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The record saved by the last successful run.
    pub fn last_result(&self) -> Option<&History> {
        self.last_result.as_ref()
    }

    /// Probe the detection service and record the outcome.
    pub async fn check_service(&mut self) -> ServiceStatus {
        self.status = match self.detector.health().await {
            Ok(()) => ServiceStatus::Ready,
            Err(e) => {
                warn!(error = %e, "Detection service unavailable");
                ServiceStatus::Error
            }
        };
        self.status
    }

    /// Choose webcam or upload. Requires a ready service.
    pub fn select_mode(&mut self, mode: CaptureMode) -> Result<(), ClientError> {
        if mode != CaptureMode::Unset {
            self.require_ready()?;
        }
        self.mode = mode;
        self.phase = DetectionPhase::Idle;
        self.last_result = None;
        Ok(())
    }

    /// Return to mode selection and discard the last result.
    pub fn reset(&mut self) {
        self.mode = CaptureMode::Unset;
        self.phase = DetectionPhase::Idle;
        self.last_result = None;
    }

    /// Detect faces in `source` and save the result to the history API.
    ///
    /// The source must match the selected mode. On failure the phase becomes
    /// [`DetectionPhase::Failed`] and the error is returned; nothing is
    /// retried.
    pub async fn run_detection(&mut self, source: ImageSource) -> Result<History, ClientError> {
        self.require_ready()?;
        if self.mode == CaptureMode::Unset {
            return Err(ClientError::State("Select webcam or upload first".to_string()));
        }
        if source.mode() != self.mode {
            return Err(ClientError::State(format!(
                "Image source does not match the selected mode ({:?})",
                self.mode
            )));
        }

        self.phase = DetectionPhase::Detecting;
        match self.detect_and_save(source).await {
            Ok(record) => {
                info!(
                    record_id = %record.id,
                    faces = record.faces_detected,
                    "Detection saved"
                );
                self.phase = DetectionPhase::ResultReady;
                self.last_result = Some(record.clone());
                Ok(record)
            }
            Err(e) => {
                warn!(error = %e, "Detection failed");
                self.phase = DetectionPhase::Failed;
                Err(e)
            }
        }
    }

    async fn detect_and_save(&self, source: ImageSource) -> Result<History, ClientError> {
        let image = source.into_data_uri().await?;
        let detection = self.detector.detect(&image).await?;
        let submission = detection.into_new_detection(image);
        self.api.submit_detection(&self.session, &submission).await
    }

    fn require_ready(&self) -> Result<(), ClientError> {
        match self.status {
            ServiceStatus::Ready => Ok(()),
            ServiceStatus::Checking => Err(ClientError::State(
                "Detection service has not been checked yet".to_string(),
            )),
            ServiceStatus::Error => Err(ClientError::State(
                "Detection service is not running".to_string(),
            )),
        }
    }
}
