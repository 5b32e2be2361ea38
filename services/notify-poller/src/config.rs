//! Configuration types for the notification poller

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PollerError;

/// Environment variable consulted when the configured API key is empty
pub const API_KEY_ENV_VAR: &str = "NOTIFY_POLLER_API_KEY";

pub const MIN_INTERVAL_SECONDS: u64 = 1;
pub const MAX_INTERVAL_SECONDS: u64 = 3600;

/// Main configuration structure
///
/// Top-level keys are camelCase so files written by the desktop client load
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project: String,
    /// Polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub item_failure_policy: ItemFailurePolicy,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            api_key: String::new(),
            project: String::new(),
            interval: default_interval(),
            debug: false,
            item_failure_policy: ItemFailurePolicy::default(),
            display: DisplayConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl Config {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Fill an empty API key from [`API_KEY_ENV_VAR`]
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
                tracing::debug!("Using API key from {}", API_KEY_ENV_VAR);
                self.api_key = key;
            }
        }
        Ok(())
    }

    /// Validate the fields that have a constrained range or format
    pub fn validate(&self) -> ConfigValidation {
        validate_config(&ConfigUpdate {
            domain: Some(self.domain.clone()),
            interval: Some(self.interval),
            debug: Some(self.debug),
            ..ConfigUpdate::default()
        })
    }
}

/// What a poll cycle does with the remaining items when one item fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailurePolicy {
    /// Drop the remaining items of the cycle; they are fetched again next tick
    #[default]
    AbortCycle,
    /// Log and publish the failure, then continue with the next item
    Isolate,
}

/// How notifications are shown on the desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBackend {
    /// Spawn a desktop notifier program
    Command,
    /// Write notifications to the log only
    Log,
}

/// Display surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_backend")]
    pub backend: DisplayBackend,
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_display_duration_ms")]
    pub duration_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            program: default_program(),
            app_name: default_app_name(),
            duration_ms: default_display_duration_ms(),
        }
    }
}

/// Local control API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_control_port")]
    pub port: u16,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_control_port(),
            history_size: default_history_size(),
        }
    }
}

fn default_domain() -> String {
    "https://notify.try-8verything.com".to_string()
}

fn default_interval() -> u64 {
    5
}

fn default_backend() -> DisplayBackend {
    DisplayBackend::Command
}

fn default_program() -> String {
    "notify-send".to_string()
}

fn default_app_name() -> String {
    "notify-poller".to_string()
}

fn default_display_duration_ms() -> u64 {
    5000
}

fn default_control_port() -> u16 {
    11120
}

fn default_history_size() -> usize {
    100
}

/// Partial configuration update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(domain) = &self.domain {
            config.domain = domain.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(project) = &self.project {
            config.project = project.clone();
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
    }
}

/// Outcome of [`validate_config`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Validate the present fields of a (partial) configuration
pub fn validate_config(update: &ConfigUpdate) -> ConfigValidation {
    let mut errors = Vec::new();

    if let Some(domain) = &update.domain {
        if domain.is_empty() {
            errors.push("domain 不可為空".to_string());
        } else if !domain.starts_with("http://") && !domain.starts_with("https://") {
            errors.push("domain 必須以 http:// 或 https:// 開頭".to_string());
        }
    }

    if let Some(interval) = update.interval {
        if !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&interval) {
            errors.push("interval 必須介於 1 到 3600 之間".to_string());
        }
    }

    ConfigValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PollerError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Write configuration to a JSON file, creating parent directories
pub fn save_config(path: &Path, config: &Config) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| {
        PollerError::Config(format!("Failed to write config file {:?}: {}", path, e))
    })?;
    Ok(())
}

/// Source of the current configuration
pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Config;

    /// Validate and persist a partial update
    fn save_config(&self, update: &ConfigUpdate) -> crate::Result<()>;
}

fn check_update(update: &ConfigUpdate) -> crate::Result<()> {
    let validation = validate_config(update);
    if validation.valid {
        Ok(())
    } else {
        Err(PollerError::Config(validation.errors.join("; ")))
    }
}

/// Configuration held in memory
#[derive(Debug, Default)]
pub struct StaticConfig {
    config: RwLock<Config>,
}

impl StaticConfig {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn get_config(&self) -> Config {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save_config(&self, update: &ConfigUpdate) -> crate::Result<()> {
        check_update(update)?;
        let mut config = match self.config.write() {
            Ok(config) => config,
            Err(poisoned) => poisoned.into_inner(),
        };
        update.apply(&mut config);
        Ok(())
    }
}

/// Configuration backed by a JSON file
///
/// The file is re-read on every access so external edits take effect on the
/// next `start()`. A missing file yields the defaults.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    /// Values that are never written back (e.g. a key from the environment)
    overlay: Config,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            overlay: Config::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> crate::Result<Config> {
        if self.path.exists() {
            load_config(&self.path)
        } else {
            Ok(Config::default())
        }
    }

    fn with_overlay(&self, mut config: Config) -> Config {
        if config.api_key.is_empty() {
            config.api_key = self.overlay.api_key.clone();
        }
        config
    }

    /// Remember the API key resolved from the environment without persisting it
    pub fn with_resolved_secrets(mut self) -> crate::Result<Self> {
        self.overlay.resolve_secrets()?;
        Ok(self)
    }
}

impl ConfigProvider for FileConfigStore {
    fn get_config(&self) -> Config {
        match self.read() {
            Ok(config) => self.with_overlay(config),
            Err(e) => {
                tracing::warn!(
                    "Failed to load config from {:?}: {}. Using defaults.",
                    self.path,
                    e
                );
                self.with_overlay(Config::default())
            }
        }
    }

    fn save_config(&self, update: &ConfigUpdate) -> crate::Result<()> {
        check_update(update)?;
        let mut config = self.read()?;
        update.apply(&mut config);
        save_config(&self.path, &config)?;
        tracing::debug!("Saved configuration to {:?}", self.path);
        Ok(())
    }
}
