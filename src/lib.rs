//! Library root for `chat-relay`.
//!
//! Chat-relay is a Slack bot that forwards mentions to a chat backend and
//! delivers the backend's answer back to the conversation:
//! - Posts a "Thinking..." placeholder as soon as it is mentioned
//! - Retries both the backend and the Slack calls under fixed-delay policies
//! - Reveals the complete answer sentence by sentence by editing the placeholder
//! - Tracks one in-flight reply per conversation
//!
//! The architecture is built around traits for the chat platform and the
//! backend, so either can be replaced (or mocked) independently.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the chat-relay runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the backend and chat clients
/// - Starts the main event loop for processing mentions
pub async fn start(config: Config) -> Void {
    info!("Starting chat-relay ...");

    // Start the crypto provider.
    if crypto::aws_lc_rs::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    info!("Chat-relay stopped.");

    Ok(())
}
