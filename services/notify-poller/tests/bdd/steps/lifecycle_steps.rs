//! BDD step definitions for the monitoring lifecycle feature

use std::time::Duration;

use cucumber::{given, then, when};

use notify_poller::{MonitorEvent, PollerError};

use crate::world::NotifyWorld;

#[given(expr = "a polling interval of {int} seconds")]
fn polling_interval(world: &mut NotifyWorld, interval: u64) {
    world.interval = interval;
}

#[when("monitoring is started")]
async fn monitoring_started(world: &mut NotifyWorld) {
    let controller = super::controller(world);
    let result = controller.start().await;
    // let the first cycle run
    tokio::time::sleep(Duration::from_millis(20)).await;
    world.start_results.push(result);
}

#[when("monitoring is stopped")]
async fn monitoring_stopped(world: &mut NotifyWorld) {
    let controller = super::controller(world);
    let mut rx = controller.events().subscribe();
    world.stop_results.push(controller.stop().await);
    while let Ok(event) = rx.try_recv() {
        world.events.push(event);
    }
}

#[then(expr = "the start results are {string}")]
fn start_results_are(world: &mut NotifyWorld, expected: String) {
    let results: Vec<String> = world
        .start_results
        .iter()
        .map(|r| match r {
            Ok(started) => started.to_string(),
            Err(_) => "error".to_string(),
        })
        .collect();
    assert_eq!(results.join(", "), expected);
}

#[then(expr = "the stop results are {string}")]
fn stop_results_are(world: &mut NotifyWorld, expected: String) {
    let results: Vec<String> = world
        .stop_results
        .iter()
        .map(|r| match r {
            Ok(stopped) => stopped.to_string(),
            Err(_) => "error".to_string(),
        })
        .collect();
    assert_eq!(results.join(", "), expected);
}

#[then("starting failed with a configuration error")]
fn start_failed_with_config_error(world: &mut NotifyWorld) {
    assert!(matches!(
        world.start_results.last(),
        Some(Err(PollerError::Config(_)))
    ));
}

#[then("monitoring is running")]
async fn monitoring_running(world: &mut NotifyWorld) {
    assert!(super::controller(world).is_monitoring().await);
}

#[then("monitoring is not running")]
async fn monitoring_not_running(world: &mut NotifyWorld) {
    assert!(!super::controller(world).is_monitoring().await);
}

#[then(expr = "the API was polled {int} time(s)")]
fn api_polled(world: &mut NotifyWorld, count: usize) {
    let fetches = world.calls().iter().filter(|c| *c == "fetch").count();
    assert_eq!(fetches, count);
}

#[then("observers were told monitoring stopped")]
fn observers_told_stopped(world: &mut NotifyWorld) {
    assert!(world
        .events
        .contains(&MonitorEvent::MonitoringStatus(false)));
}
