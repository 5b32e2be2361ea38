//! BDD step definitions for notify-poller

pub mod lifecycle_steps;
pub mod poll_cycle_steps;

use std::sync::Arc;

use notify_poller::{Config, Controller, PollerBuilder};

use crate::world::{FakeNotificationServer, NotifyWorld, RecordingDisplay};

/// Build a controller over the world's fakes, once per scenario
pub fn controller(world: &mut NotifyWorld) -> Arc<Controller> {
    if let Some(controller) = &world.controller {
        return Arc::clone(controller);
    }

    let config = Config {
        domain: "https://notify.example.com".to_string(),
        api_key: "abcdefgh-bdd-key".to_string(),
        interval: world.interval,
        item_failure_policy: world.item_failure_policy.unwrap_or_default(),
        ..Config::default()
    };
    let http = FakeNotificationServer {
        pending_status: world.pending_status,
        pending_body: world.pending_body.clone(),
        calls: Arc::clone(&world.calls),
    };
    let display = RecordingDisplay {
        failing_ids: world.failing_display_ids.clone(),
        calls: Arc::clone(&world.calls),
    };

    let controller = PollerBuilder::new(config)
        .with_http_client(Arc::new(http))
        .with_display(Arc::new(display))
        .build()
        .controller();
    world.controller = Some(Arc::clone(&controller));
    controller
}
