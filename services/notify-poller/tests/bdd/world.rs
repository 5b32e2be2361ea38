//! BDD test world for notify-poller

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cucumber::World;

use notify_poller::display::{DisplayRequest, DisplaySurface};
use notify_poller::io::{HttpClient, HttpResponse};
use notify_poller::{
    Controller, CycleReport, ItemFailurePolicy, MonitorEvent, NotificationItem, PollerError,
};

/// Shared record of what the fakes were asked to do, e.g. `show:a`, `ack:a`
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Serves one canned pending-list response and acknowledges every PATCH
#[derive(Debug)]
pub struct FakeNotificationServer {
    pub pending_status: u16,
    pub pending_body: String,
    pub calls: CallLog,
}

#[async_trait]
impl HttpClient for FakeNotificationServer {
    async fn get(
        &self,
        _url: &str,
        _headers: &[(&str, &str)],
    ) -> notify_poller::Result<HttpResponse> {
        self.calls.lock().unwrap().push("fetch".to_string());
        Ok(HttpResponse {
            status: self.pending_status,
            headers: vec![],
            body: self.pending_body.clone(),
        })
    }

    async fn patch_json(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        _body: &str,
    ) -> notify_poller::Result<HttpResponse> {
        let id = url
            .trim_end_matches("/status")
            .rsplit('/')
            .next()
            .unwrap_or_default();
        self.calls.lock().unwrap().push(format!("ack:{}", id));
        Ok(HttpResponse {
            status: 200,
            headers: vec![],
            body: r#"{"success":true}"#.to_string(),
        })
    }
}

/// Records shown notifications and fails for selected ids
#[derive(Debug)]
pub struct RecordingDisplay {
    pub failing_ids: Vec<String>,
    pub calls: CallLog,
}

#[async_trait]
impl DisplaySurface for RecordingDisplay {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn show(&self, request: &DisplayRequest) -> notify_poller::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("show:{}", request.id));
        if self.failing_ids.contains(&request.id) {
            return Err(PollerError::Display(format!(
                "notifier refused '{}'",
                request.id
            )));
        }
        Ok(())
    }
}

pub fn item(id: &str) -> NotificationItem {
    NotificationItem {
        id: id.to_string(),
        project: "alpha".to_string(),
        title: format!("Title {}", id),
        message: format!("Message {}", id),
        status: "pending".to_string(),
        created_at: "2024-01-15 10:30:00".to_string(),
        notified_at: None,
    }
}

pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, World)]
pub struct NotifyWorld {
    // Server behavior
    pub pending_status: u16,
    pub pending_body: String,
    pub failing_display_ids: Vec<String>,
    pub item_failure_policy: Option<ItemFailurePolicy>,
    pub interval: u64,
    pub calls: CallLog,

    // Results
    pub controller: Option<Arc<Controller>>,
    pub report: Option<CycleReport>,
    pub events: Vec<MonitorEvent>,
    pub start_results: Vec<notify_poller::Result<bool>>,
    pub stop_results: Vec<notify_poller::Result<bool>>,
}

impl Default for NotifyWorld {
    fn default() -> Self {
        Self {
            pending_status: 200,
            pending_body: r#"{"success":true,"data":[],"count":0}"#.to_string(),
            failing_display_ids: Vec::new(),
            item_failure_policy: None,
            interval: 60,
            calls: CallLog::default(),
            controller: None,
            report: None,
            events: Vec::new(),
            start_results: Vec::new(),
            stop_results: Vec::new(),
        }
    }
}

impl NotifyWorld {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}
