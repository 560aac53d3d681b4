// Common test utilities for the HTTP surface tests

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use event_push_service::config::{DispatchSettings, FcmSettings, ServerSettings, Settings};
use event_push_service::fcm_sender::{FcmClient, MockFcmSender};
use event_push_service::state::AppState;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub fn test_settings() -> Settings {
    Settings {
        fcm: FcmSettings {
            project_id: "test-project".to_string(),
            credentials_path: None,
        },
        dispatch: DispatchSettings::default(),
        server: ServerSettings {
            listen_addr: "127.0.0.1:0".to_string(),
        },
    }
}

/// Router backed by a mock sender, returned alongside the mock so tests can
/// script failures and inspect deliveries.
pub fn setup_app() -> (Router, MockFcmSender) {
    setup_app_with_settings(test_settings())
}

pub fn setup_app_with_settings(settings: Settings) -> (Router, MockFcmSender) {
    let mock = MockFcmSender::new();
    let client = Arc::new(FcmClient::new_with_impl(Box::new(mock.clone())));
    let state = Arc::new(AppState::new_with_client(settings, client));
    (event_push_service::handlers::router(state), mock)
}

pub async fn post_json(app: &Router, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/sendNotification")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request");
    app.clone().oneshot(request).await.expect("request failed")
}

pub async fn read_json(response: Response<Body>) -> Result<(StatusCode, serde_json::Value)> {
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = serde_json::from_slice(&bytes)?;
    Ok((status, value))
}

/// Minimal valid request body; tests mutate it as needed.
pub fn valid_body() -> serde_json::Value {
    serde_json::json!({
        "title": "Sale",
        "body": "50% off",
        "date": "2024-01-01",
        "fcmTokens": ["tokA", "tokB"],
    })
}
