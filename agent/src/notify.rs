//! Push notifications and click handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const NOTIFICATION_TITLE: &str = "S3 Smart Browser";
pub const DEFAULT_BODY: &str = "S3 Smart Browser notification";
pub const NOTIFICATION_ICON: &str = "/static/images/icon-192x192.png";
pub const NOTIFICATION_BADGE: &str = "/static/images/favicon.svg";
pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// Action id that opens the browser.
pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

/// Where the `explore` action lands.
pub const EXPLORE_TARGET: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: u32,
}

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Optional structured push payload. A payload that is not this JSON shape
/// is used verbatim as the body.
#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
}

/// Build the notification for a push message received at `now`.
pub fn build_push_notification(payload: Option<&str>, now: DateTime<Utc>) -> Notification {
    let (title, body) = match payload.map(str::trim).filter(|p| !p.is_empty()) {
        None => (None, None),
        Some(text) => match serde_json::from_str::<PushPayload>(text) {
            Ok(p) => (p.title, p.body),
            Err(_) => (None, Some(text.to_string())),
        },
    };

    Notification {
        title: title.unwrap_or_else(|| NOTIFICATION_TITLE.to_string()),
        body: body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: NOTIFICATION_ICON.to_string(),
        badge: NOTIFICATION_BADGE.to_string(),
        vibrate: VIBRATE_PATTERN.to_vec(),
        data: NotificationData {
            date_of_arrival: now,
            primary_key: 1,
        },
        actions: vec![
            NotificationAction {
                action: EXPLORE_ACTION.to_string(),
                title: "Open S3 Browser".to_string(),
                icon: NOTIFICATION_BADGE.to_string(),
            },
            NotificationAction {
                action: CLOSE_ACTION.to_string(),
                title: "Close".to_string(),
                icon: NOTIFICATION_BADGE.to_string(),
            },
        ],
    }
}

/// What a notification click resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Close the notification and open a window at the path.
    OpenWindow(String),
    /// Close the notification only.
    Dismissed,
}

/// Clicking always closes the notification; only `explore` opens a window.
pub fn handle_click(action: Option<&str>) -> ClickOutcome {
    match action {
        Some(EXPLORE_ACTION) => ClickOutcome::OpenWindow(EXPLORE_TARGET.to_string()),
        _ => ClickOutcome::Dismissed,
    }
}

/// Where notifications and window requests end up.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
    fn dismiss(&self);
    fn open_window(&self, path: &str);
}

/// Sink that only logs. Used when no desktop surface is attached.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn show(&self, notification: &Notification) {
        info!("Notification: {}: {}", notification.title, notification.body);
    }

    fn dismiss(&self) {
        info!("Notification closed");
    }

    fn open_window(&self, path: &str) {
        info!("Open window requested at {}", path);
    }
}
