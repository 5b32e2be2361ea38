//! BDD step definitions for the poll cycle feature

use cucumber::{given, then, when};
use serde_json::json;

use notify_poller::{FailureKind, ItemFailurePolicy, MonitorEvent};

use crate::world::{item, split_ids, NotifyWorld};

#[given(expr = "the notification API has pending notifications {string}")]
fn api_has_pending(world: &mut NotifyWorld, ids: String) {
    let items: Vec<_> = split_ids(&ids).iter().map(|id| item(id)).collect();
    world.pending_body = json!({
        "success": true,
        "data": items,
        "count": items.len(),
    })
    .to_string();
}

#[given(expr = "the notification API reports failure {string}")]
fn api_reports_failure(world: &mut NotifyWorld, message: String) {
    world.pending_body = json!({ "success": false, "message": message }).to_string();
}

#[given(expr = "the notification API responds with status {int} and body {string}")]
fn api_responds_with_status(world: &mut NotifyWorld, status: u16, body: String) {
    world.pending_status = status;
    world.pending_body = body;
}

#[given(expr = "the display fails for notification {string}")]
fn display_fails_for(world: &mut NotifyWorld, id: String) {
    world.failing_display_ids.push(id);
}

#[given("failed notifications are isolated")]
fn failures_isolated(world: &mut NotifyWorld) {
    world.item_failure_policy = Some(ItemFailurePolicy::Isolate);
}

#[when("a poll cycle runs")]
async fn poll_cycle_runs(world: &mut NotifyWorld) {
    let controller = super::controller(world);
    let mut rx = controller.events().subscribe();
    let report = controller.poll_once().await.expect("valid configuration");
    while let Ok(event) = rx.try_recv() {
        world.events.push(event);
    }
    world.report = Some(report);
}

#[then(expr = "the calls are {string}")]
fn calls_are(world: &mut NotifyWorld, expected: String) {
    assert_eq!(world.calls(), split_ids(&expected));
}

#[then("nothing is displayed or acknowledged")]
fn nothing_displayed(world: &mut NotifyWorld) {
    assert_eq!(world.calls(), vec!["fetch".to_string()]);
}

#[then(expr = "notification {string} is not acknowledged")]
fn not_acknowledged(world: &mut NotifyWorld, id: String) {
    assert!(!world.calls().contains(&format!("ack:{}", id)));
}

#[then(expr = "exactly one error event is published with type {string}")]
fn one_error_event(world: &mut NotifyWorld, kind: String) {
    let errors: Vec<_> = world
        .events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::ApiError { details, .. } => Some(details),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1, "events: {:?}", world.events);
    let kind = match kind.as_str() {
        "api_failure" => Some(FailureKind::ApiFailure),
        "http_error" => Some(FailureKind::HttpError),
        "network_error" => Some(FailureKind::NetworkError),
        "timeout" => Some(FailureKind::Timeout),
        _ => None,
    };
    assert_eq!(errors[0].as_ref().map(|d| d.kind), kind);
}

#[then(expr = "the error message is {string}")]
fn error_message_is(world: &mut NotifyWorld, expected: String) {
    let message = world.events.iter().find_map(|e| match e {
        MonitorEvent::ApiError { message, .. } => Some(message.clone()),
        _ => None,
    });
    assert_eq!(message.as_deref(), Some(expected.as_str()));
}

#[then(expr = "{int} notifications are received by observers")]
fn received_by_observers(world: &mut NotifyWorld, count: usize) {
    let received = world
        .events
        .iter()
        .filter(|e| matches!(e, MonitorEvent::NotificationReceived(_)))
        .count();
    assert_eq!(received, count);
}

#[then(expr = "the cycle report shows {int} fetched, {int} delivered and {int} failed")]
fn cycle_report_shows(world: &mut NotifyWorld, fetched: usize, delivered: usize, failed: usize) {
    let report = world.report.as_ref().expect("a poll cycle ran");
    assert_eq!(report.fetched, fetched);
    assert_eq!(report.delivered, delivered);
    assert_eq!(report.failed, failed);
}
