//! Client integration tests.
//!
//! Tests run the real API router and a fake detection service on ephemeral
//! local ports and verify:
//! - Registration, login and error mapping in `ApiClient`
//! - Detection service health and failure handling
//! - The full webcam/upload workflow: detect, save, list, delete

use std::io::Write;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use facedetect_api::client::{
    ApiClient, CaptureMode, DetectionPhase, DetectorClient, ImageSource, ServiceStatus, Workflow,
};
use facedetect_api::{ClientError, Session};

use super::test_utils::test_config;

const DETECTED_IMAGE: &str = "data:image/jpeg;base64,ZGV0ZWN0ZWQ=";

// =============================================================================
// Servers
// =============================================================================

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_api() -> String {
    let store = facedetect_api::MemoryStore::new();
    spawn(facedetect_api::create_router(store, test_config())).await
}

/// A detection service that finds two faces in anything it is sent.
async fn spawn_detector() -> String {
    async fn detect(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["image"].as_str().unwrap_or_default().is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": "No image provided"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "faces_count": 2,
                "faces": [
                    {"x": 10, "y": 20, "width": 30, "height": 40, "confidence": 95, "has_eyes": true},
                    {"x": 50, "y": 60, "width": 70, "height": 80, "confidence": 95, "has_eyes": false}
                ],
                "result_image": DETECTED_IMAGE,
                "image_size": "640x480"
            })),
        )
    }

    let router = Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({"status": "Face Detection Service is running"})) }),
        )
        .route("/detect-faces", post(detect));
    spawn(router).await
}

/// A detection service that is up but fails every detection.
async fn spawn_broken_detector() -> String {
    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/detect-faces",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"success": false, "error": "cannot identify image file"})),
                )
            }),
        );
    spawn(router).await
}

async fn logged_in(api: &ApiClient, email: &str) -> Session {
    api.register("Client User", email, "client-password")
        .await
        .unwrap();
    api.login(email, "client-password").await.unwrap()
}

// =============================================================================
// ApiClient
// =============================================================================

#[tokio::test]
async fn test_api_ping() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    assert_eq!(api.ping().await.unwrap(), "Face Detection API is running");
}

#[tokio::test]
async fn test_api_login_session() {
    let base = spawn_api().await;
    let api = ApiClient::new(&base).unwrap();
    let session = logged_in(&api, "session@example.com").await;

    assert_eq!(session.user.email, "session@example.com");
    assert!(!session.token.is_empty());
    assert!(session.expires_at.is_some());
    assert_eq!(session.api_base.as_str(), format!("{}/", base));
}

#[tokio::test]
async fn test_api_errors_carry_status_and_message() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    logged_in(&api, "err@example.com").await;

    let err = api.login("err@example.com", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 401, ref message } if message == "Invalid email or password"
    ));

    let err = api
        .register("Again", "err@example.com", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_api_submit_list_delete() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let session = logged_in(&api, "crud@example.com").await;

    let submission = facedetect_api::NewDetection::new("data:,a", "data:,b").with_faces_detected(1);
    let record = api.submit_detection(&session, &submission).await.unwrap();
    assert_eq!(record.user_id, session.user_id());

    let history = api.history(&session, &session.user_id()).await.unwrap();
    assert_eq!(history, vec![record.clone()]);

    api.delete_detection(&session, &record.id).await.unwrap();
    let err = api.delete_detection(&session, &record.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_api_delete_someone_elses_record_is_403() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let owner = logged_in(&api, "owner@example.com").await;
    let other = logged_in(&api, "other@example.com").await;

    let record = api
        .submit_detection(&owner, &facedetect_api::NewDetection::new("a", "b"))
        .await
        .unwrap();

    let err = api.delete_detection(&other, &record.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 403, .. }));
    assert_eq!(api.history(&owner, &owner.user_id()).await.unwrap().len(), 1);
}

// =============================================================================
// DetectorClient
// =============================================================================

#[tokio::test]
async fn test_detector_health_and_detect() {
    let detector = DetectorClient::new(&spawn_detector().await).unwrap();
    detector.health().await.unwrap();

    let result = detector.detect("data:image/png;base64,AAAA").await.unwrap();
    assert_eq!(result.faces_count, 2);
    assert_eq!(result.faces.len(), 2);
    assert_eq!(result.faces[1].has_eyes, Some(false));
    assert_eq!(result.result_image, DETECTED_IMAGE);
    assert_eq!(result.image_size.as_deref(), Some("640x480"));
}

#[tokio::test]
async fn test_detector_failure_body_is_reported() {
    let detector = DetectorClient::new(&spawn_broken_detector().await).unwrap();
    let err = detector.detect("data:,x").await.unwrap_err();
    assert!(matches!(err, ClientError::Detector(ref m) if m == "cannot identify image file"));
}

#[tokio::test]
async fn test_detector_pointed_at_wrong_service() {
    let detector = DetectorClient::new(&spawn_api().await).unwrap();
    // The API answers its JSON 404 for /detect-faces
    let err = detector.detect("data:,x").await.unwrap_err();
    assert!(matches!(err, ClientError::Detector(ref m) if m.contains("404")));
}

// =============================================================================
// Workflow
// =============================================================================

#[tokio::test]
async fn test_webcam_workflow_end_to_end() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let session = logged_in(&api, "webcam@example.com").await;
    let detector = DetectorClient::new(&spawn_detector().await).unwrap();
    let mut workflow = Workflow::new(detector, api.clone(), session.clone());

    assert_eq!(workflow.status(), ServiceStatus::Checking);
    assert_eq!(workflow.check_service().await, ServiceStatus::Ready);

    workflow.select_mode(CaptureMode::Webcam).unwrap();
    let frame = "data:image/jpeg;base64,d2ViY2Ft".to_string();
    let record = workflow
        .run_detection(ImageSource::DataUri(frame.clone()))
        .await
        .unwrap();

    assert_eq!(workflow.phase(), DetectionPhase::ResultReady);
    assert_eq!(workflow.last_result(), Some(&record));
    assert_eq!(record.original_image, frame);
    assert_eq!(record.result_image, DETECTED_IMAGE);
    assert_eq!(record.faces_detected, 2);
    assert_eq!(record.face_coordinates.len(), 2);

    let history = api.history(&session, &session.user_id()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, record.id);

    workflow.reset();
    assert_eq!(workflow.mode(), CaptureMode::Unset);
    assert_eq!(workflow.phase(), DetectionPhase::Idle);
    assert!(workflow.last_result().is_none());
}

#[tokio::test]
async fn test_upload_workflow_sends_file_as_data_uri() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let session = logged_in(&api, "upload@example.com").await;
    let detector = DetectorClient::new(&spawn_detector().await).unwrap();
    let mut workflow = Workflow::new(detector, api, session);
    workflow.check_service().await;
    workflow.select_mode(CaptureMode::Upload).unwrap();

    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(b"jpeg").unwrap();

    let record = workflow
        .run_detection(ImageSource::File(file.path().to_path_buf()))
        .await
        .unwrap();
    assert_eq!(record.original_image, "data:image/jpeg;base64,anBlZw==");
}

#[tokio::test]
async fn test_failed_detection_saves_nothing() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let session = logged_in(&api, "failed@example.com").await;
    let detector = DetectorClient::new(&spawn_broken_detector().await).unwrap();
    let mut workflow = Workflow::new(detector, api.clone(), session.clone());

    assert_eq!(workflow.check_service().await, ServiceStatus::Ready);
    workflow.select_mode(CaptureMode::Webcam).unwrap();

    let err = workflow
        .run_detection(ImageSource::DataUri("data:,x".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Detector(_)));
    assert_eq!(workflow.phase(), DetectionPhase::Failed);
    assert!(api
        .history(&session, &session.user_id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unreachable_detector_disables_capture() {
    let api = ApiClient::new(&spawn_api().await).unwrap();
    let session = logged_in(&api, "down@example.com").await;

    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let detector = DetectorClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();
    let mut workflow = Workflow::new(detector, api, session);

    assert_eq!(workflow.check_service().await, ServiceStatus::Error);
    assert!(matches!(
        workflow.select_mode(CaptureMode::Upload),
        Err(ClientError::State(_))
    ));
}
