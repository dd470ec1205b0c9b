//! Slack binding for the chat service.
//!
//! Inbound mentions arrive over Socket Mode; replies go out through
//! `chat.postMessage` and are edited in place with `chat.update`.

use crate::{
    base::{
        config::Config,
        error::RelayError,
        types::{ChatEvent, RelayResult, Res, Void},
    },
    interaction::relay::Relay,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::{errors::SlackClientError, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self::new(Arc::new(client), config.slack_retry_policy()))
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    relay: Relay,
    bot_user_id: String,
    cancel: CancellationToken,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, relay: Relay, cancel: CancellationToken) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            relay,
            bot_user_id: self.bot_user_id.clone(),
            cancel,
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events.
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Blocks until Ctrl-C.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(name = "SlackChatClient::post_message", skip(self, text))]
    async fn post_message(&self, channel_id: &str, text: &str) -> RelayResult<String> {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message);

        let session = self.client.open_session(&self.bot_token);

        let response = session.chat_post_message(&request).await.map_err(|e| classify_slack_error("failed to send message", e))?;

        Ok(response.ts.0)
    }

    #[instrument(name = "SlackChatClient::update_message", skip(self, text))]
    async fn update_message(&self, channel_id: &str, message_ts: &str, text: &str) -> RelayResult<()> {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatUpdateRequest::new(SlackChannelId(channel_id.to_string()), message, SlackTs(message_ts.to_string()));

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_update(&request).await.map_err(|e| classify_slack_error("failed to update message", e))?;

        Ok(())
    }
}

/// Maps a Slack client error onto the relay taxonomy.
///
/// Errors reported by the Slack API itself are protocol failures; everything
/// else happened on the way there.
fn classify_slack_error(context: &str, err: SlackClientError) -> RelayError {
    match err {
        SlackClientError::ApiError(api_error) => RelayError::protocol(format!("{context}: slack api error `{}`", api_error.code)),
        other => RelayError::transport(format!("{context}: {other}")),
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            let raw_text = slack_app_mention_event.content.text.as_deref().unwrap_or_default();

            let event = ChatEvent::from_mention(
                slack_app_mention_event.channel.0,
                slack_app_mention_event.user.0,
                raw_text,
                &user_state.bot_user_id,
                slack_app_mention_event.origin.ts.0,
            );

            if event.query.is_empty() {
                warn!("Skipping app mention with no text besides the mention.");
                return Ok(());
            }

            user_state.relay.dispatch(user_state.cancel.clone(), event);
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    use slack_morphism::errors::{SlackClientApiError, SlackClientEndOfStreamError};

    use super::*;

    #[test]
    fn test_api_errors_are_protocol_failures() {
        let err = classify_slack_error("failed to send message", SlackClientError::ApiError(SlackClientApiError::new("channel_not_found".to_string())));

        assert!(matches!(err, RelayError::Protocol { status: None, .. }));
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[test]
    fn test_other_errors_are_transport_failures() {
        let err = classify_slack_error("failed to update message", SlackClientError::EndOfStream(SlackClientEndOfStreamError::new()));

        assert!(matches!(err, RelayError::Transport { .. }));
        assert!(err.to_string().starts_with("transport failure: failed to update message"));
    }
}
