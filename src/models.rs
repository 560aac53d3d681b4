use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming dispatch request.
///
/// Every field is optional at the serde layer so that missing fields reach
/// the validator (which reports them all at once) instead of failing JSON
/// deserialization one field at a time.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub receiver: Option<String>,
    pub notification_type: Option<String>,
    pub fcm_tokens: Option<Vec<String>>,
    pub priority: Option<String>,
    pub sound: Option<String>,
    pub data: Option<HashMap<String, String>>,
}

impl NotificationRequest {
    /// Lowercased receiver, defaulting to "all" when absent.
    pub fn receiver(&self) -> String {
        self.receiver
            .as_deref()
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "all".to_string())
    }

    /// Lowercased notification type, defaulting to "normal" when absent.
    pub fn notification_type(&self) -> String {
        self.notification_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "normal".to_string())
    }

    pub fn priority(&self) -> String {
        self.priority
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("high")
            .to_string()
    }

    pub fn sound(&self) -> String {
        self.sound
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("default")
            .to_string()
    }

    /// Trimmed image URL, `None` when absent or blank.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Tokens that survive blank-filtering, in input order.
    pub fn usable_tokens(&self) -> Vec<String> {
        self.fcm_tokens
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect()
    }
}

// Structure for the FCM message payload.
// See: https://firebase.google.com/docs/reference/fcm/rest/v1/projects.messages#Message
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FcmPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<FcmNotification>,
    pub data: Option<HashMap<String, String>>,

    // Platform specific overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FcmNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Aggregated outcome of one dispatch request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub total_tokens: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_tokens: Vec<FailedDelivery>,
    pub has_image: bool,
}

/// One failed send. The token is truncated so full registration tokens
/// never appear in responses or logs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FailedDelivery {
    pub token: String,
    pub error: String,
}
