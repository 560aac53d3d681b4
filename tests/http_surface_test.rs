// Tests for the HTTP surface itself: methods, health, CORS.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_get_on_dispatch_endpoint_is_405_with_json_body() -> Result<()> {
    let (app, _mock) = common::setup_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/sendNotification")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    let (status, body) = common::read_json(response).await?;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Method not allowed"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_gets_structured_envelope() -> Result<()> {
    let (app, mock) = common::setup_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/sendNotification")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": \"Sale\","))?;
    let response = app.oneshot(request).await?;
    let (status, body) = common::read_json(response).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Invalid request body"));
    assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));
    assert!(mock.get_sent_messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (app, _mock) = common::setup_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_cors_allows_any_origin() -> Result<()> {
    let (app, _mock) = common::setup_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/sendNotification")
        .header(header::ORIGIN, "https://admin.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    Ok(())
}
