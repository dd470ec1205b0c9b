//! Binary entry point for `mock-backend`.
//!
//! Serves the chat backend contract locally so the relay can be exercised
//! without a real responder.

use chat_relay::{
    base::{telemetry, types::Void},
    service::backend::mock::MockBackend,
};
use clap::Parser;
use tracing::info;

/// Mock chat backend for local development.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "MOCK_BACKEND_PORT", default_value_t = 8081)]
    port: u16,
    /// Increase log verbosity (-v, -vv, etc.).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    telemetry::init(args.verbose, "mock-backend", false)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("Mock chat backend listening on http://localhost:{}", args.port);

    axum::serve(listener, MockBackend::default().router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down mock backend ...");
        })
        .await?;

    info!("Mock backend stopped.");

    Ok(())
}
