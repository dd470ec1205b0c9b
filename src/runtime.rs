//! Runtime services and shared state for the chat-relay.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{delivery::ResponseDeliverer, relay::Relay, tracker::ConversationTracker},
    service::{backend::BackendClient, chat::ChatClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the collaborators, and the relay built
/// from them. It is designed to be trivially cloneable, allowing it to be passed
/// around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The backend client instance.
    pub backend: BackendClient,
    /// The relay orchestrator.
    pub relay: Relay,
    /// Cancelled when the runtime shuts down; every relay run observes it.
    pub cancel: CancellationToken,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the backend client.
        let backend = BackendClient::http(&config)?;

        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Self::with_clients(config, chat, backend)
    }

    /// Create a runtime from already constructed clients.
    pub fn with_clients(config: Config, chat: ChatClient, backend: BackendClient) -> Res<Self> {
        let relay = Relay::builder()
            .chat(chat.clone())
            .backend(backend.clone())
            .tracker(ConversationTracker::new())
            .deliverer(ResponseDeliverer::new(config.delivery_pacing))
            .build()?;

        Ok(Self {
            config,
            chat,
            backend,
            relay,
            cancel: CancellationToken::new(),
        })
    }

    /// Listen for mentions until the chat listener stops, then cancel in-flight runs.
    pub async fn start(&self) -> Void {
        let result = self.chat.start(self.relay.clone(), self.cancel.clone()).await;

        info!("Chat listener stopped; cancelling {} in-flight relays ...", self.relay.tracker().len());
        self.cancel.cancel();

        result
    }
}
