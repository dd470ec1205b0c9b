//! Binary entry point for `chat-relay`.
//!
//! This module provides the command-line interface for chat-relay with options
//! for configuration file paths and logging verbosity. It initializes the
//! necessary components and starts the service.

use chat_relay::base::{config::Config, telemetry, types::Void};
use clap::Parser;

/// Chat-relay – relays Slack mentions to a chat backend.
///
/// Configuration can come from `config.toml` or `CHAT_RELAY_*` environment
/// variables. The bot answers every mention with a placeholder, asks the
/// backend, and edits the placeholder until the full answer is shown.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Service name reported to the trace collector.
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "chatrelay-bot")]
    service_name: String,
    /// Do not export spans over OTLP.
    #[arg(long)]
    no_telemetry: bool,
}

/// Main entry point for the chat-relay binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the bot.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    telemetry::init(args.verbose, &args.service_name, !args.no_telemetry)?;

    let config = Config::load(args.config.as_deref())?;

    chat_relay::start(config).await
}
