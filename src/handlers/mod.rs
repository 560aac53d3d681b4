pub mod notifications;

use crate::{error::ServiceError, state::AppState};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn method_not_allowed() -> ServiceError {
    ServiceError::MethodNotAllowed
}

/// Builds the service router. The endpoint is called cross-origin from the
/// admin frontend, so all origins are permitted.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sendNotification", post(notifications::send_notification))
        .route("/health", get(health_check))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
