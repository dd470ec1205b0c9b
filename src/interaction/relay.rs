//! The relay orchestrator: one run per inbound mention.
//!
//! A run posts a placeholder, claims the conversation, asks the backend for an
//! answer and reveals it through the [`ResponseDeliverer`]. The conversation is
//! released on every exit path.

use std::{fmt, sync::Arc};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{
        error::RelayError,
        types::{ChatEvent, ChatQuery, DeliveryHandle, RelayResult},
    },
    service::{backend::BackendClient, chat::ChatClient},
};

use super::{delivery::ResponseDeliverer, tracker::ConversationTracker};

/// Text of the message posted before the backend answers.
pub const PLACEHOLDER: &str = "Thinking...";

/// Shown in place of the placeholder when the conversation already has a run in flight.
pub const BUSY_NOTICE: &str = "I'm still working on your previous question. Please wait for that answer before asking another.";

/// User-facing text for a backend failure.
pub fn backend_failure_notice(err: &RelayError) -> String {
    format!("Apologies, I encountered an error: {err}")
}

/// The states a relay run moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    InitialSent,
    BackendPending,
    Streaming,
    Finalized,
    /// The conversation already had a run in flight.
    Rejected,
    Errored,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-run bookkeeping of the current state.
struct RelayRun {
    state: RelayState,
}

impl RelayRun {
    fn new() -> Self {
        Self { state: RelayState::Idle }
    }

    fn transition(&mut self, next: RelayState) {
        debug!(from = %self.state, to = %next, "Relay transition");
        self.state = next;
    }

    fn fail(&mut self, err: RelayError) -> RelayError {
        self.transition(RelayState::Errored);
        err
    }
}

struct RelayInner {
    chat: ChatClient,
    backend: BackendClient,
    tracker: ConversationTracker,
    deliverer: ResponseDeliverer,
}

/// Relays mentions to the backend and streams answers back.
///
/// This is trivially cloneable; clones share collaborators and the tracker.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    pub fn builder() -> RelayBuilder {
        RelayBuilder::default()
    }

    /// The registry of in-flight deliveries.
    pub fn tracker(&self) -> &ConversationTracker {
        &self.inner.tracker
    }

    /// Runs [`Relay::on_mention`] as an independent task and logs its outcome.
    #[instrument(skip_all)]
    pub fn dispatch(&self, cancel: CancellationToken, event: ChatEvent) -> JoinHandle<()> {
        let relay = self.clone();

        tokio::spawn(
            async move {
                // Process the event.
                let result = relay.on_mention(&cancel, event).await;

                // Log any errors.
                if let Err(err) = &result {
                    error!("Error while relaying: {}", err);
                }
            }
            .in_current_span(),
        )
    }

    /// Handles one mention from start to finish.
    ///
    /// The placeholder is posted first; if that fails there is nothing to report
    /// through, so the error is returned as is. Backend failures are reported to
    /// the user in place of the placeholder before being returned.
    #[instrument(name = "Relay::on_mention", skip_all, fields(channel = %event.channel, user = %event.user))]
    pub async fn on_mention(&self, cancel: &CancellationToken, event: ChatEvent) -> RelayResult<()> {
        let RelayInner { chat, backend, tracker, deliverer } = &*self.inner;
        let mut run = RelayRun::new();
        let key = event.conversation_key();

        info!(query = %event.query, "Processing app mention");

        // Post the placeholder.

        let handle = chat.send(cancel, &key, PLACEHOLDER).await.map_err(|err| run.fail(err))?;
        run.transition(RelayState::InitialSent);

        // Claim the conversation; held until this function returns.

        let _registration = match tracker.register(handle.clone()) {
            Ok(registration) => registration,
            Err(existing) => {
                warn!(owner = %existing.message_ts, "Conversation {} already has a reply in flight", key);
                self.notify(cancel, &handle, BUSY_NOTICE).await;
                run.transition(RelayState::Rejected);
                return Ok(());
            }
        };

        // Ask the backend.

        run.transition(RelayState::BackendPending);

        let query = ChatQuery {
            user_id: event.user.clone(),
            query: event.query.clone(),
        };

        let answer = match backend.request_answer(cancel, &query).await {
            Ok(answer) => answer,
            Err(err) => {
                error!("Failed to get response from chat backend: {}", err);
                let err = run.fail(err);
                if !err.is_cancelled() {
                    self.notify(cancel, &handle, &backend_failure_notice(&err)).await;
                }
                return Err(err);
            }
        };

        info!("Received response from chat backend ({} bytes)", answer.full_response.len());

        // Reveal the answer.

        run.transition(RelayState::Streaming);

        deliverer.deliver(cancel, chat, &handle, &answer.full_response).await.map_err(|err| run.fail(err))?;

        run.transition(RelayState::Finalized);
        info!("Successfully relayed response");

        Ok(())
    }

    /// Best-effort replacement of the placeholder text.
    async fn notify(&self, cancel: &CancellationToken, handle: &DeliveryHandle, text: &str) {
        if let Err(err) = self.inner.chat.update(cancel, handle, text).await {
            error!("Failed to update placeholder: {}", err);
        }
    }
}

/// Assembles a [`Relay`] from its collaborators.
#[derive(Default)]
pub struct RelayBuilder {
    chat: Option<ChatClient>,
    backend: Option<BackendClient>,
    tracker: Option<ConversationTracker>,
    deliverer: Option<ResponseDeliverer>,
}

impl RelayBuilder {
    pub fn chat(mut self, chat: ChatClient) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn backend(mut self, backend: BackendClient) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn tracker(mut self, tracker: ConversationTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn deliverer(mut self, deliverer: ResponseDeliverer) -> Self {
        self.deliverer = Some(deliverer);
        self
    }

    /// Fails with [`RelayError::State`] if the chat or backend client is missing.
    pub fn build(self) -> RelayResult<Relay> {
        let chat = self.chat.ok_or_else(|| RelayError::state("chat client is not set"))?;
        let backend = self.backend.ok_or_else(|| RelayError::state("backend client is not set"))?;

        Ok(Relay {
            inner: Arc::new(RelayInner {
                chat,
                backend,
                tracker: self.tracker.unwrap_or_default(),
                deliverer: self.deliverer.unwrap_or_default(),
            }),
        })
    }
}

// Tests.
