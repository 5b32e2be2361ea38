//! Desktop display surface for notifications

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{DisplayBackend, DisplayConfig};
use crate::PollerError;

/// A notification to be shown on the desktop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRequest {
    pub id: String,
    pub title: String,
    pub message: String,
    pub duration: Duration,
}

/// Trait for showing notifications to the user
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySurface: Send + Sync {
    /// Short name of the surface (e.g. "command")
    fn name(&self) -> &'static str;

    /// Show a notification
    async fn show(&self, request: &DisplayRequest) -> crate::Result<()>;
}

/// Build the display surface selected by the configuration
pub fn from_config(config: &DisplayConfig) -> Arc<dyn DisplaySurface> {
    match config.backend {
        DisplayBackend::Command => Arc::new(CommandDisplay::new(config)),
        DisplayBackend::Log => Arc::new(LogDisplay),
    }
}

/// Shows notifications by running a desktop notifier program
///
/// Invoked as `<program> --app-name <app> --expire-time <ms> <title> <message>`,
/// the argument form understood by `notify-send`.
#[derive(Debug, Clone)]
pub struct CommandDisplay {
    program: String,
    app_name: String,
}

impl CommandDisplay {
    pub fn new(config: &DisplayConfig) -> Self {
        tracing::debug!("Created CommandDisplay using '{}'", config.program);
        Self {
            program: config.program.clone(),
            app_name: config.app_name.clone(),
        }
    }

    pub fn args(&self, request: &DisplayRequest) -> Vec<String> {
        vec![
            "--app-name".to_string(),
            self.app_name.clone(),
            "--expire-time".to_string(),
            request.duration.as_millis().to_string(),
            request.title.clone(),
            request.message.clone(),
        ]
    }
}

#[async_trait]
impl DisplaySurface for CommandDisplay {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn show(&self, request: &DisplayRequest) -> crate::Result<()> {
        tracing::debug!(
            "Showing notification '{}' via {}: title='{}'",
            request.id,
            self.program,
            request.title
        );

        let output = tokio::process::Command::new(&self.program)
            .args(self.args(request))
            .output()
            .await
            .map_err(|e| {
                PollerError::Display(format!("Failed to run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(PollerError::Display(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::debug!("Notification '{}' shown", request.id);
        Ok(())
    }
}

/// Writes notifications to the log instead of the desktop
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

#[async_trait]
impl DisplaySurface for LogDisplay {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn show(&self, request: &DisplayRequest) -> crate::Result<()> {
        tracing::info!("[notification {}] {}: {}", request.id, request.title, request.message);
        Ok(())
    }
}
