//! Shared state for monitoring status and delivery history

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::NotificationItem;

/// A notification that was displayed and acknowledged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub item: NotificationItem,
    pub delivered_epoch_ms: u64,
}

/// Snapshot of the monitoring loop for observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub monitoring: bool,
    pub last_poll_epoch_ms: u64,
    pub cycles: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Shared state accessible by the controller and the control API
#[derive(Debug)]
pub struct SharedState {
    pub status: StatusSnapshot,
    pub history: VecDeque<DeliveryRecord>,
    pub history_max_size: usize,
}

impl SharedState {
    pub fn new(history_max_size: usize) -> Self {
        Self {
            status: StatusSnapshot::default(),
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
        }
    }

    pub fn set_monitoring(&mut self, monitoring: bool) {
        self.status.monitoring = monitoring;
    }

    /// Record the outcome of a poll cycle
    pub fn record_cycle(&mut self, now_ms: u64, error: Option<String>) {
        self.status.cycles += 1;
        self.status.last_poll_epoch_ms = now_ms;
        match error {
            Some(message) => {
                self.status.consecutive_failures += 1;
                self.status.last_error = Some(message);
            }
            None => {
                self.status.consecutive_failures = 0;
            }
        }
    }

    /// Add a delivered notification to history
    pub fn add_delivery(&mut self, record: DeliveryRecord) {
        if self.history_max_size == 0 {
            return;
        }
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(history_max_size)))
}
