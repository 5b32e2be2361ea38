//! Events published by the monitoring loop to UI observers

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ErrorDetails, NotificationItem};

pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Outbound event for UI observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum MonitorEvent {
    /// Monitoring was started (`true`) or stopped (`false`)
    MonitoringStatus(bool),
    /// A notification was displayed and acknowledged
    NotificationReceived(NotificationItem),
    /// A poll cycle or item failed
    ApiError {
        message: String,
        details: Option<ErrorDetails>,
    },
}

/// Sender half of the event channel
///
/// Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: MonitorEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }
}
