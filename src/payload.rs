use crate::models::{FcmNotification, FcmPayload, NotificationRequest};
use serde_json::json;
use std::collections::HashMap;

const SENDER: &str = "admin";
const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";
const PROMOTIONAL_CHANNEL: &str = "promotional_channel";
const NORMAL_CHANNEL: &str = "normal_channel";

/// Builds the per-request message template.
///
/// The same template is reused for every recipient; the sender overlays the
/// token onto a clone. `timestamp_ms` is captured once at dispatch time so
/// all recipients of one request carry the same timestamp.
pub fn build_payload(req: &NotificationRequest, timestamp_ms: i64) -> FcmPayload {
    let title = req.title.as_deref().unwrap_or("").trim().to_string();
    let body = req.body.as_deref().unwrap_or("").trim().to_string();
    let date = req.date.as_deref().unwrap_or("").trim().to_string();
    let priority = req.priority();
    let sound = req.sound();
    let notification_type = req.notification_type();
    let image_url = req.image_url();

    let display_title = format!("{} - {}", date, title);

    // Caller data first, reserved keys afterwards so they always win.
    let mut data: HashMap<String, String> = req.data.clone().unwrap_or_default();
    data.insert("sender".to_string(), SENDER.to_string());
    data.insert("receiver".to_string(), req.receiver());
    data.insert("notificationType".to_string(), notification_type.clone());
    data.insert("date".to_string(), date);
    data.insert("originalTitle".to_string(), title);
    data.insert("timestamp".to_string(), timestamp_ms.to_string());
    data.insert("clickAction".to_string(), CLICK_ACTION.to_string());

    let channel_id = if notification_type == "promotional" {
        PROMOTIONAL_CHANNEL
    } else {
        NORMAL_CHANNEL
    };
    let high_priority = priority == "high";

    let mut android_notification = json!({
        "sound": sound,
        "clickAction": CLICK_ACTION,
        "channelId": channel_id,
    });

    let mut apns = json!({
        "headers": {
            "apns-priority": if high_priority { "10" } else { "5" },
        },
        "payload": {
            "aps": {
                "sound": sound,
                "badge": 1,
                "mutable-content": 1,
            },
        },
    });

    let mut webpush_notification = json!({
        "requireInteraction": high_priority,
    });

    if let Some(url) = image_url {
        android_notification["imageUrl"] = json!(url);
        apns["fcm_options"] = json!({ "image": url });
        webpush_notification["image"] = json!(url);
        data.insert("imageUrl".to_string(), url.to_string());
    }

    let android = json!({
        "priority": priority,
        "notification": android_notification,
    });

    let webpush = json!({
        "headers": {
            "Urgency": if high_priority { "high" } else { "normal" },
        },
        "notification": webpush_notification,
    });

    FcmPayload {
        notification: Some(FcmNotification {
            title: Some(display_title),
            body: Some(body),
        }),
        data: Some(data),
        android: Some(android),
        webpush: Some(webpush),
        apns: Some(apns),
    }
}
