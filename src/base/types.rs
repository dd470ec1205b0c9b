use std::fmt;

use serde::{Deserialize, Serialize};

use super::{error::RelayError, text::strip_mention};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Result type for the relay core.
pub type RelayResult<T> = Result<T, RelayError>;

/// A normalized inbound mention directed at the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// The channel the mention was posted in.
    pub channel: String,
    /// The user who mentioned the bot.
    pub user: String,
    /// The mention text with the bot marker stripped and whitespace trimmed.
    pub query: String,
    /// The Slack timestamp of the inbound message.
    pub timestamp: String,
}

impl ChatEvent {
    /// Builds an event from a raw mention, removing every `<@bot_user_id>` marker.
    pub fn from_mention(channel: impl Into<String>, user: impl Into<String>, raw_text: &str, bot_user_id: &str, timestamp: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            query: strip_mention(raw_text, bot_user_id),
            timestamp: timestamp.into(),
        }
    }

    /// The conversation this event belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(&self.channel, &self.user)
    }
}

/// Request body sent to the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQuery {
    pub user_id: String,
    pub query: String,
}

/// Response body returned by the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub full_response: String,
}

/// Identifies one logical exchange: a user talking to the bot in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub channel: String,
    pub user: String,
}

impl ConversationKey {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self { channel: channel.into(), user: user.into() }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.channel, self.user)
    }
}

/// The message currently being edited for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryHandle {
    pub key: ConversationKey,
    /// Slack `ts` of the message; this is the message identity for updates.
    pub message_ts: String,
}

impl DeliveryHandle {
    pub fn new(key: ConversationKey, message_ts: impl Into<String>) -> Self {
        Self { key, message_ts: message_ts.into() }
    }

    /// The channel the message lives in.
    pub fn channel(&self) -> &str {
        &self.key.channel
    }
}

// Tests.
