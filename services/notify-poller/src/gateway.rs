//! Client for the remote notification API
//!
//! Every call runs under a timeout, logs its request and response with the
//! API key redacted, and classifies failures into [`FailureKind`] with an
//! attached [`ErrorDetails`] snapshot.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::config::Config;
use crate::helpers::{build_api_url, iso_timestamp, redact_api_key, ErrorBody};
use crate::io::{HttpClient, HttpResponse};
use crate::types::{ApiResponse, ErrorDetails, FailureKind, NotificationItem, NotificationStatus};
use crate::{PollerError, Result};

pub const PENDING_ENDPOINT: &str = "/api/notifications/windows/pending";

/// Timeout for data calls (fetch and status update)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Timeout for the lightweight connectivity check
pub const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_millis(5_000);

const API_KEY_HEADER: &str = "X-API-Key";
const CONTENT_TYPE_HEADER: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

fn status_endpoint(id: &str) -> String {
    format!("/api/notifications/windows/{}/status", id)
}

/// Remote operations the monitoring loop depends on
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait NotificationApi: Send + Sync {
    /// Fetch notifications that have not been delivered yet
    async fn fetch_pending_notifications(&self) -> Result<Vec<NotificationItem>>;

    /// Report a new status for a notification
    async fn update_notification_status(&self, id: &str, status: NotificationStatus)
        -> Result<()>;

    /// Check that the API is reachable and accepts the key
    async fn test_connection(&self) -> Result<bool>;
}

/// Builds a gateway from the current configuration
pub trait GatewayFactory: Send + Sync {
    fn create(&self, config: &Config) -> Arc<dyn NotificationApi>;
}

/// Factory producing [`ApiClient`]s over a shared HTTP client
pub struct ApiClientFactory {
    http: Arc<dyn HttpClient>,
}

impl ApiClientFactory {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

impl GatewayFactory for ApiClientFactory {
    fn create(&self, config: &Config) -> Arc<dyn NotificationApi> {
        Arc::new(ApiClient::new(
            &config.domain,
            &config.api_key,
            Arc::clone(&self.http),
        ))
    }
}

/// Request snapshot used for logging and failure diagnostics
struct Call {
    method: &'static str,
    url: String,
    request_headers: BTreeMap<String, String>,
    request_body: Option<serde_json::Value>,
    started: Instant,
}

impl Call {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn details(&self, kind: FailureKind, duration_ms: u64) -> ErrorDetails {
        ErrorDetails {
            kind,
            method: self.method.to_string(),
            url: self.url.clone(),
            request_headers: Some(self.request_headers.clone()),
            request_body: self.request_body.clone(),
            response_status: None,
            response_status_text: None,
            response_headers: None,
            response_body: None,
            error_name: None,
            error_message: None,
            duration_ms,
            timestamp: iso_timestamp(),
        }
    }

    fn with_response(
        &self,
        kind: FailureKind,
        response: &HttpResponse,
        body: &ErrorBody,
    ) -> ErrorDetails {
        ErrorDetails {
            response_status: Some(response.status),
            response_status_text: Some(response.status_text()),
            response_headers: Some(response.headers.iter().cloned().collect()),
            response_body: Some(body.display_body().to_string()),
            ..self.details(kind, self.elapsed_ms())
        }
    }
}

/// Client for the notification API
pub struct ApiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    connection_test_timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &redact_api_key(&self.api_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, http: Arc<dyn HttpClient>) -> Self {
        if api_key.trim().is_empty() {
            tracing::error!("API key is empty or not configured");
        } else {
            tracing::debug!("API key configured (length: {})", api_key.len());
        }

        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connection_test_timeout: CONNECTION_TEST_TIMEOUT,
            http,
        }
    }

    /// Override the data-call and connection-test timeouts
    pub fn with_timeouts(mut self, timeout: Duration, connection_test_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connection_test_timeout = connection_test_timeout;
        self
    }

    fn call(
        &self,
        method: &'static str,
        url: &str,
        include_content_type: bool,
        request_body: Option<serde_json::Value>,
    ) -> Call {
        let mut request_headers = BTreeMap::new();
        if include_content_type {
            request_headers.insert(
                CONTENT_TYPE_HEADER.to_string(),
                JSON_CONTENT_TYPE.to_string(),
            );
        }
        request_headers.insert(API_KEY_HEADER.to_string(), redact_api_key(&self.api_key));

        Call {
            method,
            url: url.to_string(),
            request_headers,
            request_body,
            started: Instant::now(),
        }
    }

    /// Await a request under `timeout`, classifying timeouts and transport faults
    ///
    /// Dropping the request future on timeout aborts the in-flight call.
    async fn send<F>(&self, call: &Call, timeout: Duration, request: F) -> Result<HttpResponse>
    where
        F: Future<Output = Result<HttpResponse>>,
    {
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(network_error(call, e)),
            Err(_) => Err(timed_out(call, timeout)),
        }
    }

    /// Parse a 2xx body as an envelope and reject `success: false`
    fn read_envelope<T: DeserializeOwned>(
        &self,
        call: &Call,
        response: &HttpResponse,
    ) -> Result<ApiResponse<T>> {
        let envelope: ApiResponse<T> = match serde_json::from_str(&response.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let body = ErrorBody::parse(&response.body);
                let mut details = call.with_response(FailureKind::ApiFailure, response, &body);
                details.error_name = Some("JsonError".to_string());
                details.error_message = Some(e.to_string());
                log_failure("API response could not be parsed", &details);
                return Err(PollerError::Gateway {
                    message: format!("API response could not be parsed: {}", e),
                    details: Box::new(details),
                });
            }
        };

        if !envelope.success {
            let body = ErrorBody::parse(&response.body);
            let details = call.with_response(FailureKind::ApiFailure, response, &body);
            log_failure(
                &format!("API reported failure (HTTP {} but success=false)", response.status),
                &details,
            );
            let message = envelope.message.as_deref().unwrap_or("(no message)");
            return Err(PollerError::Gateway {
                message: format!("API reported failure: {}", message),
                details: Box::new(details),
            });
        }

        Ok(envelope)
    }
}

fn http_error(call: &Call, response: &HttpResponse, prefix: &str) -> PollerError {
    let body = ErrorBody::parse(&response.body);
    let details = call.with_response(FailureKind::HttpError, response, &body);
    log_failure("API call failed", &details);
    PollerError::Gateway {
        message: format!("{}{}", prefix, body.describe(response.status)),
        details: Box::new(details),
    }
}

fn timed_out(call: &Call, timeout: Duration) -> PollerError {
    let timeout_ms = timeout.as_millis() as u64;
    let mut details = call.details(FailureKind::Timeout, timeout_ms);
    details.error_name = Some("TimeoutError".to_string());
    details.error_message = Some(format!("no response within {}ms", timeout_ms));
    log_failure("API request timed out", &details);
    PollerError::Gateway {
        message: format!("API request timed out after {}ms", timeout_ms),
        details: Box::new(details),
    }
}

/// Classify an unclassified transport error, keeping its message text
fn network_error(call: &Call, error: PollerError) -> PollerError {
    if error.details().is_some() {
        return error;
    }
    let mut details = call.details(FailureKind::NetworkError, call.elapsed_ms());
    details.error_name = Some(error.name().to_string());
    details.error_message = Some(error.to_string());
    log_failure("Network error", &details);
    PollerError::Gateway {
        message: error.to_string(),
        details: Box::new(details),
    }
}

fn log_failure(title: &str, details: &ErrorDetails) {
    let mut lines = vec![
        format!("{} [{}]", title, details.kind),
        format!("  request: {} {}", details.method, details.url),
    ];
    if let Some(headers) = &details.request_headers {
        lines.push(format!("  request headers: {:?}", headers));
    }
    if let Some(body) = &details.request_body {
        lines.push(format!("  request body: {}", body));
    }
    if let Some(status) = details.response_status {
        lines.push(format!(
            "  response status: HTTP {} {}",
            status,
            details.response_status_text.as_deref().unwrap_or_default()
        ));
    }
    if let Some(headers) = &details.response_headers {
        lines.push(format!("  response headers: {:?}", headers));
    }
    if let Some(body) = &details.response_body {
        lines.push(format!("  response body: {}", body));
    }
    if let Some(message) = &details.error_message {
        lines.push(format!(
            "  error: {}: {}",
            details.error_name.as_deref().unwrap_or("Error"),
            message
        ));
    }
    lines.push(format!("  duration: {}ms", details.duration_ms));
    tracing::error!("{}", lines.join("\n"));
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn fetch_pending_notifications(&self) -> Result<Vec<NotificationItem>> {
        let url = build_api_url(&self.base_url, PENDING_ENDPOINT);
        let call = self.call("GET", &url, true, None);
        tracing::debug!("API request: GET {}", url);
        tracing::debug!("Request headers: {:?}", call.request_headers);

        let headers = [
            (CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE),
            (API_KEY_HEADER, self.api_key.as_str()),
        ];
        let response = self
            .send(&call, self.timeout, self.http.get(&url, &headers))
            .await?;
        if !response.is_success() {
            return Err(http_error(&call, &response, "API responded with error: "));
        }

        let envelope: ApiResponse<Vec<NotificationItem>> = self.read_envelope(&call, &response)?;
        tracing::debug!(
            "API response: HTTP {} ({}ms) | count: {} | success: {}",
            response.status,
            call.elapsed_ms(),
            envelope.count.unwrap_or_default(),
            envelope.success
        );

        Ok(envelope.data.unwrap_or_default())
    }

    async fn update_notification_status(
        &self,
        id: &str,
        status: NotificationStatus,
    ) -> Result<()> {
        let url = build_api_url(&self.base_url, &status_endpoint(id));
        let payload = serde_json::json!({ "status": status });
        let body = payload.to_string();
        let call = self.call("PATCH", &url, true, Some(payload));
        tracing::debug!("API request: PATCH {} | Body: {}", url, body);

        let headers = [
            (CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE),
            (API_KEY_HEADER, self.api_key.as_str()),
        ];
        let response = self
            .send(&call, self.timeout, self.http.patch_json(&url, &headers, &body))
            .await?;
        if !response.is_success() {
            return Err(http_error(&call, &response, "API responded with error: "));
        }

        let envelope: ApiResponse<serde_json::Value> = self.read_envelope(&call, &response)?;
        tracing::debug!(
            "API response: HTTP {} ({}ms) | success: {} | message: {}",
            response.status,
            call.elapsed_ms(),
            envelope.success,
            envelope.message.as_deref().unwrap_or_default()
        );

        Ok(())
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = build_api_url(&self.base_url, PENDING_ENDPOINT);
        let call = self.call("GET", &url, false, None);
        tracing::debug!("Testing connection: GET {}", url);
        tracing::debug!("Request headers: {:?}", call.request_headers);

        let headers = [(API_KEY_HEADER, self.api_key.as_str())];
        let response = self
            .send(
                &call,
                self.connection_test_timeout,
                self.http.get(&url, &headers),
            )
            .await?;
        if !response.is_success() {
            let prefix = format!("HTTP {}: ", response.status);
            return Err(http_error(&call, &response, &prefix));
        }

        tracing::info!("API connection test succeeded ({}ms)", call.elapsed_ms());
        Ok(true)
    }
}
