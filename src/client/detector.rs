//! Client for the external face detection service.
//!
//! The service exposes two endpoints:
//!
//! ```text
//! GET  /health        -> 200 when ready
//! POST /detect-faces  {"image": "<data URI>"}
//!                     -> {"success": true, "faces_count": 2, "faces": [...],
//!                         "result_image": "data:image/jpeg;base64,...",
//!                         "image_size": "640x480"}
//!                     -> {"success": false, "error": "..."}  (usually 400)
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::ClientError;
use crate::history::{FaceBox, NewDetection};

/// Default detection service location.
pub const DEFAULT_DETECTOR_URL: &str = "http://localhost:5000";

/// Default request timeout; detection on large images can be slow.
pub const DEFAULT_DETECTOR_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
}

/// Raw response body of `POST /detect-faces`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorResponse {
    pub success: bool,

    #[serde(default)]
    pub faces_count: Option<u32>,

    #[serde(default)]
    pub faces: Vec<FaceBox>,

    #[serde(default)]
    pub result_image: Option<String>,

    /// `"{width}x{height}"` of the decoded input
    #[serde(default)]
    pub image_size: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// A successful detection.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    pub faces_count: u32,
    pub faces: Vec<FaceBox>,

    /// Annotated image as a data URI
    pub result_image: String,

    pub image_size: Option<String>,
}

impl FaceDetection {
    /// Build the history submission for this result.
    pub fn into_new_detection(self, original_image: impl Into<String>) -> NewDetection {
        NewDetection::new(original_image, self.result_image)
            .with_faces_detected(self.faces_count)
            .with_face_coordinates(self.faces)
    }
}

impl TryFrom<DetectorResponse> for FaceDetection {
    type Error = ClientError;

    fn try_from(response: DetectorResponse) -> Result<Self, Self::Error> {
        if !response.success {
            return Err(ClientError::Detector(
                response
                    .error
                    .unwrap_or_else(|| "detection failed".to_string()),
            ));
        }

        let result_image = response
            .result_image
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::Detector("response has no result image".to_string()))?;

        Ok(Self {
            faces_count: response
                .faces_count
                .unwrap_or(response.faces.len() as u32),
            faces: response.faces,
            result_image,
            image_size: response.image_size,
        })
    }
}

/// HTTP client for the detection service.
#[derive(Debug, Clone)]
pub struct DetectorClient {
    http: Client,
    base: Url,
}

impl DetectorClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(DEFAULT_DETECTOR_TIMEOUT).build()?;
        Self::with_client(http, base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base: base_url_with_slash(base_url)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Liveness probe.
    ///
    /// Any 2xx answer counts as ready; the body is ignored.
    pub async fn health(&self) -> Result<(), ClientError> {
        let url = self.base.join("health")?;
        let response = self.http.get(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!(status = response.status().as_u16(), "Detection service health check failed");
            Err(ClientError::Detector(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }

    /// Run detection on an image given as a data URI.
    pub async fn detect(&self, image: &str) -> Result<FaceDetection, ClientError> {
        let url = self.base.join("detect-faces")?;
        debug!(bytes = image.len(), "Sending image to detection service");

        let response = self
            .http
            .post(url)
            .json(&DetectRequest { image })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Failures still carry a JSON body with `error`
        let parsed: DetectorResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(ClientError::Detector(format!("invalid response: {}", e)));
            }
            Err(_) => {
                return Err(ClientError::Detector(format!(
                    "service returned {}: {}",
                    status, body
                )));
            }
        };

        let detection = FaceDetection::try_from(parsed)?;
        debug!(faces = detection.faces_count, "Detection service answered");
        Ok(detection)
    }
}

/// Parse a base URL so that relative joins append to its path.
pub(crate) fn base_url_with_slash(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
