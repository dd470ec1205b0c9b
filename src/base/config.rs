//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};

use super::{retry::RetryPolicy, types::Res};

/// Default timeout for requests to the chat backend.
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Default number of retries for any outbound call.
fn default_retry_count() -> u32 {
    3
}

/// Default delay between retries.
fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

/// Default pause between incremental message updates.
fn default_delivery_pacing() -> Duration {
    Duration::from_millis(500)
}

/// Variables prefixed with `CHAT_RELAY_`, e.g. `CHAT_RELAY_SLACK_BOT_TOKEN`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("CHAT_RELAY").try_parsing(true)
}

/// Configuration for the chat-relay application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app token used for Socket Mode (`CHAT_RELAY_SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`CHAT_RELAY_SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Base URL of the chat backend (`CHAT_RELAY_CHAT_BACKEND_URL`).
    pub chat_backend_url: String,
    /// Timeout for a single backend request (`CHAT_RELAY_REQUEST_TIMEOUT_MS`).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "request_timeout_ms", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Retries for Slack API calls (`CHAT_RELAY_SLACK_API_RETRY_COUNT`).
    #[serde(default = "default_retry_count")]
    pub slack_api_retry_count: u32,
    /// Delay between Slack API retries (`CHAT_RELAY_SLACK_API_RETRY_DELAY_MS`).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "slack_api_retry_delay_ms", default = "default_retry_delay")]
    pub slack_api_retry_delay: Duration,
    /// Retries for backend calls (`CHAT_RELAY_BACKEND_API_RETRY_COUNT`).
    #[serde(default = "default_retry_count")]
    pub backend_api_retry_count: u32,
    /// Delay between backend retries (`CHAT_RELAY_BACKEND_API_RETRY_DELAY_MS`).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "backend_api_retry_delay_ms", default = "default_retry_delay")]
    pub backend_api_retry_delay: Duration,
    /// Pause between incremental updates of a reply (`CHAT_RELAY_DELIVERY_PACING_MS`).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "delivery_pacing_ms", default = "default_delivery_pacing")]
    pub delivery_pacing: Duration,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        Self::load_with_env(environment(), explicit_path)
    }

    /// Loads from the given environment source, then the config file.
    fn load_with_env(env: config::Environment, explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(env);

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks the values that cannot be expressed by the types alone.
    pub fn validate(&self) -> Res<()> {
        if self.slack_app_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Slack app token must not be empty."));
        }

        if self.slack_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Slack bot token must not be empty."));
        }

        if !(self.chat_backend_url.starts_with("http://") || self.chat_backend_url.starts_with("https://")) {
            return Err(anyhow::anyhow!("Chat backend URL must be an http(s) URL, got `{}`.", self.chat_backend_url));
        }

        if self.request_timeout.is_zero() {
            return Err(anyhow::anyhow!("Request timeout must be greater than zero."));
        }

        Ok(())
    }

    /// Retry policy for the Slack leg.
    pub fn slack_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.slack_api_retry_count, self.slack_api_retry_delay)
    }

    /// Retry policy for the backend leg.
    pub fn backend_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.backend_api_retry_count, self.backend_api_retry_delay)
    }
}

// Tests.
