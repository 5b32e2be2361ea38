//! Notify Poller CLI
//!
//! Command-line interface for the desktop notification polling service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use notify_poller::config::ConfigUpdate;
use notify_poller::helpers::redact_api_key;
use notify_poller::{ConfigProvider, FileConfigStore, PollerBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "notify-poller")]
#[command(about = "Desktop notification polling service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "notify-poller.json")]
    config: PathBuf,

    /// Log level (defaults to debug when the config enables debug, info otherwise)
    #[arg(short, long)]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start monitoring until Ctrl-C (default)
    Run,
    /// Check connectivity and credentials against the notification API
    TestConnection,
    /// Show a test notification on the desktop
    TestNotification,
    /// Run a single poll cycle and exit
    PollOnce,
    /// Show or change the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration with the API key redacted
    Show,
    /// Validate and save a partial update
    Set(SetArgs),
}

#[derive(ClapArgs)]
struct SetArgs {
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    interval: Option<u64>,
    #[arg(long)]
    debug: Option<bool>,
}

impl From<SetArgs> for ConfigUpdate {
    fn from(args: SetArgs) -> Self {
        ConfigUpdate {
            domain: args.domain,
            api_key: args.api_key,
            project: args.project,
            interval: args.interval,
            debug: args.debug,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let store = Arc::new(FileConfigStore::new(args.config.clone()).with_resolved_secrets()?);
    let config = store.get_config();

    let log_level = args.log_level.unwrap_or(if config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    });
    tracing_subscriber::fmt().with_max_level(log_level).init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, log_level={:?}",
        args.config,
        log_level
    );

    let poller = PollerBuilder::with_config_provider(Arc::clone(&store) as Arc<dyn ConfigProvider>)
        .build();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!("Starting notify poller");
            poller.start().await?;
        }
        Command::TestConnection => {
            poller.controller().test_connection().await?;
            println!("API connection OK");
        }
        Command::TestNotification => {
            poller.controller().test_notification().await?;
            println!("Test notification sent");
        }
        Command::PollOnce => {
            let report = poller.controller().poll_once().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(error) = report.error {
                return Err(error.into());
            }
        }
        Command::Config(ConfigCommand::Show) => {
            let mut shown = config;
            if !shown.api_key.is_empty() {
                shown.api_key = redact_api_key(&shown.api_key);
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        Command::Config(ConfigCommand::Set(set)) => {
            let update = ConfigUpdate::from(set);
            if update.is_empty() {
                println!("Nothing to update");
                return Ok(());
            }
            store.save_config(&update)?;
            println!("Saved configuration to {}", store.path().display());
        }
    }

    Ok(())
}
