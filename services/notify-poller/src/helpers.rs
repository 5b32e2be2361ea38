//! Small pure helpers shared by the gateway, config and CLI

use std::time::{SystemTime, UNIX_EPOCH};

/// Marker appended to a truncated secret
pub const REDACTION_MARKER: &str = "***";

/// Number of leading key characters kept when redacting
const VISIBLE_KEY_CHARS: usize = 8;

/// Join a domain and an endpoint path with exactly one slash
///
/// Any number of trailing slashes on `domain` are removed and `endpoint` is
/// given a leading slash if it lacks one.
pub fn build_api_url(domain: &str, endpoint: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{}{}", domain, endpoint)
    } else {
        format!("{}/{}", domain, endpoint)
    }
}

/// Redact an API key to its first 8 characters followed by `***`
///
/// Keys of 8 characters or fewer keep only their first half, so the full key
/// is never reproduced.
pub fn redact_api_key(key: &str) -> String {
    let len = key.chars().count();
    let visible = if len > VISIBLE_KEY_CHARS {
        VISIBLE_KEY_CHARS
    } else {
        len / 2
    };
    let prefix: String = key.chars().take(visible).collect();
    format!("{}{}", prefix, REDACTION_MARKER)
}

/// Best-effort structured view of an error response body
///
/// The raw text is always kept; `json` is present only when the body parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub raw: String,
    pub json: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Self {
        Self {
            raw: body.to_string(),
            json: serde_json::from_str(body).ok(),
        }
    }

    /// The `message` field of a JSON body, if any
    pub fn message(&self) -> Option<&str> {
        self.json
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
    }

    /// Message for a failed call: JSON `message`, else raw text, else `HTTP <status>`
    pub fn describe(&self, status: u16) -> String {
        if let Some(message) = self.message() {
            return message.to_string();
        }
        if !self.raw.is_empty() {
            return self.raw.clone();
        }
        format!("HTTP {}", status)
    }

    /// Raw body, or `(empty)` for logging
    pub fn display_body(&self) -> &str {
        if self.raw.is_empty() {
            "(empty)"
        } else {
            &self.raw
        }
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision
pub fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
