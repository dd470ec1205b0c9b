//! Chat service integration for chat-relay.
//!
//! This module provides functionality for interacting with chat platforms like Slack:
//! - Receiving mentions and dispatching relay runs
//! - Posting a message and editing it in place
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Slack.

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::{
    base::{
        retry::{RetryExecutor, RetryPolicy},
        types::{ConversationKey, DeliveryHandle, RelayResult, Void},
    },
    interaction::relay::Relay,
};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Message operations make a single attempt; [`ChatClient`] adds the
/// retry policy on top.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to strip the mention marker from inbound text.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Every qualifying mention is handed to `relay` as an independent task.
    /// Returns when the listener shuts down.
    async fn start(&self, relay: Relay, cancel: CancellationToken) -> Void;

    /// Post a new message to a channel and return its timestamp.
    async fn post_message(&self, channel_id: &str, text: &str) -> RelayResult<String>;

    /// Replace the text of an existing message.
    async fn update_message(&self, channel_id: &str, message_ts: &str, text: &str) -> RelayResult<()>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
    retry: RetryExecutor,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            retry: RetryExecutor::new(policy),
        }
    }

    /// Send a new message into the conversation, establishing its delivery handle.
    #[instrument(name = "ChatClient::send", skip(self, cancel, text), fields(key = %key))]
    pub async fn send(&self, cancel: &CancellationToken, key: &ConversationKey, text: &str) -> RelayResult<DeliveryHandle> {
        let total = self.retry.policy().total_attempts();
        let mut attempt = 0;

        let message_ts = self
            .retry
            .execute(cancel, || {
                attempt += 1;
                let attempt = attempt;

                async move {
                    let result = self.inner.post_message(&key.channel, text).await;

                    if let Err(err) = &result {
                        warn!("Send attempt {attempt}/{total} failed: {err}");
                    }

                    result
                }
            })
            .await?;

        Ok(DeliveryHandle::new(key.clone(), message_ts))
    }

    /// Replace the text of the message addressed by `handle`.
    #[instrument(name = "ChatClient::update", skip(self, cancel, text), fields(key = %handle.key, ts = %handle.message_ts))]
    pub async fn update(&self, cancel: &CancellationToken, handle: &DeliveryHandle, text: &str) -> RelayResult<()> {
        let total = self.retry.policy().total_attempts();
        let mut attempt = 0;

        self.retry
            .execute(cancel, || {
                attempt += 1;
                let attempt = attempt;

                async move {
                    let result = self.inner.update_message(handle.channel(), &handle.message_ts, text).await;

                    if let Err(err) = &result {
                        warn!("Update attempt {attempt}/{total} failed: {err}");
                    }

                    result
                }
            })
            .await
    }
}
