//! Wire types for the notification API and failure diagnostics

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A missing or `null` string field reads as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A pending notification as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
    #[serde(default)]
    pub notified_at: Option<String>,
}

/// Envelope wrapping every endpoint's payload
///
/// `success: false` is a failure even when the HTTP status was 2xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Delivery status reported back to the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Delivered,
    Read,
    Dismissed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Read => "read",
            NotificationStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a failed API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Non-2xx transport status
    HttpError,
    /// Envelope reported `success: false` on a 2xx response
    ApiFailure,
    /// Connection-level fault
    NetworkError,
    /// The call did not finish within its timeout
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HttpError => write!(f, "http_error"),
            FailureKind::ApiFailure => write!(f, "api_failure"),
            FailureKind::NetworkError => write!(f, "network_error"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Diagnostic snapshot of a failed API call
///
/// Built once per failure and passed upward unchanged. Header values never
/// contain the full API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_text_fields_read_as_empty() {
        let json = r#"{
            "success": true,
            "data": [
                {"id": "a", "project": null, "title": null, "message": "M1", "status": null, "created_at": null, "notified_at": null},
                {"id": "b", "title": "T2", "message": null}
            ]
        }"#;

        let envelope: ApiResponse<Vec<NotificationItem>> = serde_json::from_str(json).unwrap();
        let items = envelope.data.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "");
        assert_eq!(items[0].project, "");
        assert_eq!(items[0].message, "M1");
        assert_eq!(items[0].created_at, "");
        assert_eq!(items[1].title, "T2");
        assert_eq!(items[1].message, "");
        assert_eq!(items[1].status, "");
    }

    #[test]
    fn parse_pending_envelope() {
        let json = r#"{
            "success": true,
            "data": [
                {
                    "id": "n-1",
                    "project": "alpha",
                    "title": "Build finished",
                    "message": "main is green",
                    "status": "pending",
                    "created_at": "2024-01-15 10:30:00",
                    "notified_at": null
                }
            ],
            "count": 1
        }"#;

        let envelope: ApiResponse<Vec<NotificationItem>> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.count, Some(1));
        assert_eq!(envelope.message, None);
        let items = envelope.data.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "n-1");
        assert_eq!(items[0].title, "Build finished");
        assert_eq!(items[0].notified_at, None);
    }

    #[test]
    fn parse_failure_envelope_without_data() {
        let json = r#"{"success": false, "message": "invalid project"}"#;
        let envelope: ApiResponse<Vec<NotificationItem>> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("invalid project"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let body = serde_json::json!({ "status": NotificationStatus::Delivered });
        assert_eq!(body.to_string(), r#"{"status":"delivered"}"#);
        assert_eq!(NotificationStatus::default(), NotificationStatus::Delivered);
        assert_eq!(NotificationStatus::Dismissed.to_string(), "dismissed");
    }

    #[test]
    fn error_details_use_camel_case_and_type_tag() {
        let details = ErrorDetails {
            kind: FailureKind::HttpError,
            method: "GET".to_string(),
            url: "https://example.com/api".to_string(),
            request_headers: None,
            request_body: None,
            response_status: Some(401),
            response_status_text: Some("Unauthorized".to_string()),
            response_headers: None,
            response_body: Some("(empty)".to_string()),
            error_name: None,
            error_message: None,
            duration_ms: 12,
            timestamp: "2024-01-15T10:30:00.000Z".to_string(),
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["type"], "http_error");
        assert_eq!(json["responseStatus"], 401);
        assert_eq!(json["responseStatusText"], "Unauthorized");
        assert_eq!(json["duration"], 12);
        assert!(json.get("requestHeaders").is_none());
    }
}
