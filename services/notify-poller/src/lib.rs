//! Notify Poller - desktop notification polling service
//!
//! Polls a remote notification API for pending items, shows each one on the
//! desktop, and reports it back as delivered.

pub mod config;
pub mod control;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod gateway;
pub mod helpers;
pub mod io;
pub mod state;
pub mod types;

pub use config::{load_config, Config, ConfigProvider, FileConfigStore, StaticConfig};
pub use controller::{Controller, CycleReport, ItemFailurePolicy};
pub use error::{PollerError, Result};
pub use events::{EventBus, MonitorEvent};
pub use gateway::{ApiClient, ApiClientFactory, GatewayFactory, NotificationApi};
pub use types::{ErrorDetails, FailureKind, NotificationItem, NotificationStatus};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::display::DisplaySurface;
use crate::io::{HttpClient, ReqwestHttpClient};

/// Builder for a [`Poller`]
pub struct PollerBuilder {
    config: Arc<dyn ConfigProvider>,
    http: Option<Arc<dyn HttpClient>>,
    display: Option<Arc<dyn DisplaySurface>>,
    policy: Option<ItemFailurePolicy>,
    cancel: Option<CancellationToken>,
}

impl PollerBuilder {
    pub fn new(config: Config) -> Self {
        Self::with_config_provider(Arc::new(StaticConfig::new(config)))
    }

    pub fn with_config_provider(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            config,
            http: None,
            display: None,
            policy: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_display(mut self, display: Arc<dyn DisplaySurface>) -> Self {
        self.display = Some(display);
        self
    }

    /// Override `itemFailurePolicy` from the configuration
    pub fn with_item_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use an external token instead of Ctrl-C to end [`Poller::start`]
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Poller {
        let config = self.config.get_config();
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let display = self
            .display
            .unwrap_or_else(|| display::from_config(&config.display));
        let surface = display.name();
        tracing::debug!("Using display surface '{}'", surface);

        let mut controller = Controller::new(
            Arc::clone(&self.config),
            Arc::new(ApiClientFactory::new(http)),
            display,
        );
        if let Some(policy) = self.policy {
            controller = controller.with_item_failure_policy(policy);
        }

        Poller {
            controller: Arc::new(controller),
            config: self.config,
            cancel: self.cancel,
        }
    }
}

/// A configured poller, ready to run
pub struct Poller {
    controller: Arc<Controller>,
    config: Arc<dyn ConfigProvider>,
    cancel: Option<CancellationToken>,
}

impl Poller {
    pub fn controller(&self) -> Arc<Controller> {
        Arc::clone(&self.controller)
    }

    /// Start monitoring and block until cancelled or Ctrl-C
    pub async fn start(self) -> Result<()> {
        let cancel = match self.cancel {
            Some(cancel) => cancel,
            None => {
                let cancel = CancellationToken::new();
                let cancel_for_signal = cancel.clone();
                tokio::spawn(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for ctrl-c: {}", e);
                        return;
                    }
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                });
                cancel
            }
        };

        let config = self.config.get_config();
        if config.control.enabled {
            let controller = Arc::clone(&self.controller);
            let cancel_for_control = cancel.clone();
            let port = config.control.port;
            tokio::spawn(async move {
                if let Err(e) = control::serve(controller, port, cancel_for_control).await {
                    tracing::error!("{}. Continuing without control API.", e);
                }
            });
        }

        self.controller.start().await?;
        tracing::info!("Notify poller started");

        cancel.cancelled().await;

        self.controller.stop().await?;
        tracing::info!("Notify poller stopped");
        Ok(())
    }
}
