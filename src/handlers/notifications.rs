use crate::{
    dispatch,
    error::{Result, ServiceError},
    models::NotificationRequest,
    payload,
    state::AppState,
    validation,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// POST /sendNotification
///
/// Validates the request, builds the shared message template and fans the
/// send out across all usable tokens. Individual delivery failures are
/// reported in-band in the 200 response; the HTTP status reflects only
/// whether the request itself was valid and processed.
#[instrument(skip_all)]
pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    // Malformed JSON gets the same structured envelope as validation errors
    let Json(request) = body.map_err(|e| ServiceError::InvalidBody(e.body_text()))?;

    let errors = validation::validate_request(
        &request,
        state.settings.dispatch.require_targeting_fields,
    );
    if !errors.is_empty() {
        info!(violations = errors.len(), "Rejecting invalid request");
        return Err(ServiceError::Validation(errors));
    }

    // Second gate: the first only checks array shape, not per-token content.
    let tokens = request.usable_tokens();
    if tokens.is_empty() {
        info!("Rejecting request with no usable tokens");
        return Err(ServiceError::NoValidTokens);
    }

    let has_image = request.image_url().is_some();
    let template = payload::build_payload(&request, Utc::now().timestamp_millis());

    info!(
        token_count = tokens.len(),
        has_image,
        notification_type = %request.notification_type(),
        "Dispatching notification"
    );

    let report = dispatch::dispatch(
        Arc::clone(&state.fcm_client),
        tokens,
        template,
        state.settings.dispatch.concurrency,
        has_image,
    )
    .await;

    let message = format!(
        "Notification dispatched: {} succeeded, {} failed",
        report.success_count, report.failure_count
    );
    info!(
        success = report.success_count,
        failed = report.failure_count,
        "Dispatch finished"
    );

    Ok(Json(json!({
        "success": true,
        "message": message,
        "details": report,
    })))
}
