//! Monitoring loop: periodic poll, display and acknowledge
//!
//! The [`Controller`] owns the on/off lifecycle. Each poll cycle fetches the
//! pending notifications and, strictly one item at a time, displays the item,
//! reports it as delivered, records it in history and publishes it to
//! observers. Failures are caught at the cycle boundary, logged and published;
//! they never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigProvider};
pub use crate::config::ItemFailurePolicy;
use crate::display::{DisplayRequest, DisplaySurface};
use crate::events::{EventBus, MonitorEvent};
use crate::gateway::{GatewayFactory, NotificationApi};
use crate::helpers::current_epoch_ms;
use crate::state::{new_state_handle, DeliveryRecord, StateHandle};
use crate::types::{NotificationItem, NotificationStatus};
use crate::{PollerError, Result};

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
    pub error: Option<String>,
}

/// Everything a single poll cycle needs, cloned into the polling task
#[derive(Clone)]
struct PollCycle {
    api: Arc<dyn NotificationApi>,
    display: Arc<dyn DisplaySurface>,
    events: EventBus,
    state: StateHandle,
    policy: ItemFailurePolicy,
    display_duration: Duration,
    /// Shared by every cycle of one controller, across restarts and `poll_once`
    guard: Arc<Mutex<()>>,
}

impl PollCycle {
    async fn run(&self) -> CycleReport {
        let _running = self.guard.lock().await;

        let items = match self.api.fetch_pending_notifications().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Checking notifications failed: {}", e);
                self.publish_error(&e);
                self.state
                    .write()
                    .await
                    .record_cycle(current_epoch_ms(), Some(e.to_string()));
                return CycleReport {
                    error: Some(e.to_string()),
                    ..CycleReport::default()
                };
            }
        };

        let mut report = CycleReport {
            fetched: items.len(),
            ..CycleReport::default()
        };

        for (index, item) in items.iter().enumerate() {
            match self.deliver(item).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Delivering notification '{}' failed: {}", item.id, e);
                    self.publish_error(&e);
                    report.error = Some(e.to_string());

                    if self.policy == ItemFailurePolicy::AbortCycle {
                        let remaining = items.len() - index - 1;
                        if remaining > 0 {
                            tracing::warn!(
                                "Skipping {} remaining notifications until the next cycle",
                                remaining
                            );
                        }
                        break;
                    }
                }
            }
        }

        if !items.is_empty() {
            tracing::info!("Found {} pending notifications", items.len());
        }

        self.state
            .write()
            .await
            .record_cycle(current_epoch_ms(), report.error.clone());
        report
    }

    /// Display, acknowledge, record and publish one item, in that order
    async fn deliver(&self, item: &NotificationItem) -> Result<()> {
        let request = DisplayRequest {
            id: item.id.clone(),
            title: item.title.clone(),
            message: item.message.clone(),
            duration: self.display_duration,
        };
        self.display.show(&request).await?;

        self.api
            .update_notification_status(&item.id, NotificationStatus::Delivered)
            .await?;

        self.state.write().await.add_delivery(DeliveryRecord {
            item: item.clone(),
            delivered_epoch_ms: current_epoch_ms(),
        });
        self.events
            .publish(MonitorEvent::NotificationReceived(item.clone()));
        tracing::info!("Notified: {} - {}", item.title, item.message);
        Ok(())
    }

    fn publish_error(&self, error: &PollerError) {
        self.events.publish(MonitorEvent::ApiError {
            message: error.to_string(),
            details: error.details().cloned(),
        });
    }
}

async fn poll_loop(cycle: PollCycle, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // a cycle that outlasts the interval skips the ticks it missed
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // first tick completes immediately
    ticker.tick().await;
    loop {
        cycle.run().await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Polling loop cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }
    }
}

struct PollingTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the monitoring lifecycle
///
/// `start` and `stop` are idempotent. The polling task exists exactly while
/// monitoring is on.
pub struct Controller {
    config: Arc<dyn ConfigProvider>,
    gateways: Arc<dyn GatewayFactory>,
    display: Arc<dyn DisplaySurface>,
    events: EventBus,
    state: StateHandle,
    /// Overrides `itemFailurePolicy` from the configuration when set
    policy: Option<ItemFailurePolicy>,
    cycle_guard: Arc<Mutex<()>>,
    task: Mutex<Option<PollingTask>>,
}

impl Controller {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        gateways: Arc<dyn GatewayFactory>,
        display: Arc<dyn DisplaySurface>,
    ) -> Self {
        let history_size = config.get_config().control.history_size;
        Self {
            config,
            gateways,
            display,
            events: EventBus::new(),
            state: new_state_handle(history_size),
            policy: None,
            cycle_guard: Arc::new(Mutex::new(())),
            task: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_state(mut self, state: StateHandle) -> Self {
        self.state = state;
        self
    }

    pub fn with_item_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    fn cycle_for(&self, config: &Config) -> PollCycle {
        PollCycle {
            api: self.gateways.create(config),
            display: Arc::clone(&self.display),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            policy: self.policy.unwrap_or(config.item_failure_policy),
            display_duration: Duration::from_millis(config.display.duration_ms),
            guard: Arc::clone(&self.cycle_guard),
        }
    }

    fn current_config(&self) -> Result<Config> {
        let config = self.config.get_config();
        let validation = config.validate();
        if !validation.valid {
            return Err(PollerError::Config(validation.errors.join("; ")));
        }
        Ok(config)
    }

    /// Start monitoring: poll now, then every configured interval
    ///
    /// Returns `Ok(false)` if monitoring was already running.
    pub async fn start(&self) -> Result<bool> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::debug!("Monitoring already running");
            return Ok(false);
        }

        let config = self.current_config()?;
        let cycle = self.cycle_for(&config);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            cycle,
            config.polling_interval(),
            cancel.clone(),
        ));
        *task = Some(PollingTask { cancel, handle });

        self.state.write().await.set_monitoring(true);
        tracing::info!("Monitoring started - interval: {} s", config.interval);
        self.events.publish(MonitorEvent::MonitoringStatus(true));
        Ok(true)
    }

    /// Stop scheduling cycles; a cycle already running is allowed to finish
    ///
    /// Returns `Ok(false)` if monitoring was not running.
    pub async fn stop(&self) -> Result<bool> {
        let mut task = self.task.lock().await;
        let Some(running) = task.take() else {
            tracing::debug!("Monitoring already stopped");
            return Ok(false);
        };

        running.cancel.cancel();
        self.state.write().await.set_monitoring(false);
        tracing::info!("Monitoring stopped");
        self.events.publish(MonitorEvent::MonitoringStatus(false));
        Ok(true)
    }

    pub async fn is_monitoring(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Run one poll cycle with the current configuration, outside the timer
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let config = self.current_config()?;
        Ok(self.cycle_for(&config).run().await)
    }

    /// Check connectivity with the current configuration
    pub async fn test_connection(&self) -> Result<bool> {
        let config = self.current_config()?;
        self.gateways.create(&config).test_connection().await
    }

    /// Show a fixed notification to check the display surface
    pub async fn test_notification(&self) -> Result<()> {
        let config = self.config.get_config();
        let request = DisplayRequest {
            id: format!("test-{}", current_epoch_ms()),
            title: "Test notification".to_string(),
            message: "This is a test notification to confirm that desktop notifications work."
                .to_string(),
            duration: Duration::from_millis(config.display.duration_ms),
        };
        self.display.show(&request).await
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(running) = self.task.get_mut().take() {
            running.cancel.cancel();
        }
    }
}
