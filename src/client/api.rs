//! Client for the detection-history API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::account::UserProfile;
use crate::error::ClientError;
use crate::history::{History, NewDetection};
use crate::ids::{RecordId, UserId};
use crate::server::{
    DetectResponse, ErrorResponse, HistoryResponse, LoginResponse, MessageResponse,
    RegisterResponse,
};

use super::detector::base_url_with_slash;
use super::session::Session;

/// Default history API location.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

/// Default request timeout; submissions carry two base64 images.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for `/api/auth/*` and `/api/facedetect/*`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(DEFAULT_API_TIMEOUT).build()?;
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

    /// Check that the API answers `GET /`.
    pub async fn ping(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.base.clone()).send().await?;
        let body: MessageResponse = parse(response).await?;
        Ok(body.message)
    }

    /// Create an account.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let url = self.base.join("api/auth/register")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;

        let body: RegisterResponse = parse(response).await?;
        Ok(body.user)
    }

    /// Log in and open a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let url = self.base.join("api/auth/login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: LoginResponse = parse(response).await?;
        debug!(user_id = %body.user.id, "Logged in");

        let mut session = Session::new(self.base.clone(), body.token, body.user);
        session.expires_at = Some(body.expires_at);
        Ok(session)
    }

    /// Persist a detection for the session user.
    pub async fn submit_detection(
        &self,
        session: &Session,
        detection: &NewDetection,
    ) -> Result<History, ClientError> {
        let url = self.base.join("api/facedetect/detect")?;
        let request = self.http.post(url).json(detection);

        let body: DetectResponse = send_authorized(request, session).await?;
        Ok(body.detection)
    }

    /// Recent detections of `user`, newest first.
    pub async fn history(
        &self,
        session: &Session,
        user: &UserId,
    ) -> Result<Vec<History>, ClientError> {
        let url = self.base.join(&format!("api/facedetect/history/{}", user))?;
        let request = self.http.get(url);

        let body: HistoryResponse = send_authorized(request, session).await?;
        Ok(body.history)
    }

    /// Delete a detection owned by the session user.
    pub async fn delete_detection(
        &self,
        session: &Session,
        id: &RecordId,
    ) -> Result<(), ClientError> {
        let url = self.base.join(&format!("api/facedetect/delete/{}", id))?;
        let request = self.http.delete(url);

        let _: MessageResponse = send_authorized(request, session).await?;
        Ok(())
    }
}

async fn send_authorized<T: DeserializeOwned>(
    request: RequestBuilder,
    session: &Session,
) -> Result<T, ClientError> {
    let response = request
        .header(reqwest::header::AUTHORIZATION, session.bearer())
        .send()
        .await?;
    parse(response).await
}

/// Decode a success body, or turn an error body into [`ClientError::Api`].
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.message)
        .unwrap_or(text);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
