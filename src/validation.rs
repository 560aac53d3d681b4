use crate::models::NotificationRequest;
use url::Url;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_BODY_CHARS: usize = 500;
pub const MAX_IMAGE_URL_CHARS: usize = 2000;
pub const MAX_TOKENS_PER_REQUEST: usize = 500;

/// Checks every rule independently and returns the full, ordered list of
/// violations so the caller gets complete diagnostic feedback in one pass.
///
/// An empty list means the request may proceed to token filtering and
/// dispatch. Repeating the same request yields the same list.
pub fn validate_request(
    req: &NotificationRequest,
    require_targeting_fields: bool,
) -> Vec<String> {
    let mut errors = Vec::new();

    if is_blank(&req.title) {
        errors.push("Title is required and must be a non-empty string".to_string());
    }
    if is_blank(&req.body) {
        errors.push("Body is required and must be a non-empty string".to_string());
    }
    if is_blank(&req.date) {
        errors.push("Date is required and must be a non-empty string".to_string());
    }

    // Presence of the targeting fields. When `require_targeting_fields` is
    // off, absent fields fall back to "all" / "normal" and only a
    // present-but-blank value is rejected.
    if blank_violation(&req.receiver, require_targeting_fields) {
        errors.push("Receiver is required and must be a non-empty string".to_string());
    }
    if blank_violation(&req.notification_type, require_targeting_fields) {
        errors.push(
            "Notification type is required and must be a non-empty string".to_string(),
        );
    }

    if let Some(title) = req.title.as_deref() {
        if title.chars().count() > MAX_TITLE_CHARS {
            errors.push(format!(
                "Title must be {} characters or less",
                MAX_TITLE_CHARS
            ));
        }
    }
    if let Some(body) = req.body.as_deref() {
        if body.chars().count() > MAX_BODY_CHARS {
            errors.push(format!("Body must be {} characters or less", MAX_BODY_CHARS));
        }
    }

    if let Some(image_url) = req.image_url() {
        if Url::parse(image_url).is_err() {
            errors.push("Image URL must be a valid URL".to_string());
        }
        if image_url.chars().count() > MAX_IMAGE_URL_CHARS {
            errors.push(format!(
                "Image URL must be {} characters or less",
                MAX_IMAGE_URL_CHARS
            ));
        }
    }

    match req.fcm_tokens.as_deref() {
        None | Some([]) => {
            errors.push("FCM tokens are required and must be a non-empty array".to_string());
        }
        Some(tokens) if tokens.len() > MAX_TOKENS_PER_REQUEST => {
            errors.push(format!(
                "Maximum {} FCM tokens allowed per request",
                MAX_TOKENS_PER_REQUEST
            ));
        }
        Some(_) => {}
    }

    if let Some(kind) = non_blank(&req.notification_type) {
        if !matches!(kind.to_lowercase().as_str(), "promotional" | "normal") {
            errors.push(
                "Notification type must be either 'promotional' or 'normal'".to_string(),
            );
        }
    }
    if let Some(receiver) = non_blank(&req.receiver) {
        if !matches!(receiver.to_lowercase().as_str(), "all" | "specific") {
            errors.push("Receiver must be either 'all' or 'specific'".to_string());
        }
    }

    errors
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn blank_violation(value: &Option<String>, required: bool) -> bool {
    match value.as_deref() {
        Some(v) => v.trim().is_empty(),
        None => required,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
