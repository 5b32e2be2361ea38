//! Error types for the notification poller

use crate::types::{ErrorDetails, FailureKind};

/// Errors that can occur in the notification poller
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A classified failure from the notification API, with its diagnostic record
    #[error("{message}")]
    Gateway {
        message: String,
        details: Box<ErrorDetails>,
    },

    #[error("Display error: {0}")]
    Display(String),

    #[error("Control API error: {0}")]
    Control(String),
}

impl PollerError {
    /// Diagnostic record attached to a gateway failure
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            PollerError::Gateway { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Failure classification of a gateway failure
    pub fn kind(&self) -> Option<FailureKind> {
        self.details().map(|d| d.kind)
    }

    /// Short name of the error variant, used as `errorName` in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            PollerError::Config(_) => "ConfigError",
            PollerError::Http(_) => "HttpError",
            PollerError::Io(_) => "IoError",
            PollerError::Json(_) => "JsonError",
            PollerError::Gateway { .. } => "GatewayError",
            PollerError::Display(_) => "DisplayError",
            PollerError::Control(_) => "ControlError",
        }
    }
}

/// Result type alias for poller operations
pub type Result<T> = std::result::Result<T, PollerError>;
