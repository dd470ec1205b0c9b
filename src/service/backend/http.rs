//! HTTP binding for the chat backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::base::{
    config::Config,
    error::RelayError,
    types::{ChatAnswer, ChatQuery, RelayResult, Res},
};

use super::{BackendClient, CHAT_PATH, GenericBackendClient};

// Extra methods on `BackendClient` applied by the http implementation.

impl BackendClient {
    /// Creates a backend client that talks JSON over HTTP.
    pub fn http(config: &Config) -> Res<Self> {
        let client = HttpBackendClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.backend_retry_policy()))
    }
}

// Specific implementations.

/// HTTP backend client implementation.
#[derive(Clone)]
pub struct HttpBackendClient {
    url: String,
    client: reqwest::Client,
}

impl HttpBackendClient {
    /// Create a new HTTP backend client using the configured base URL and timeout.
    #[instrument(name = "HttpBackendClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let client = reqwest::Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self::with_client(&config.chat_backend_url, client))
    }

    /// Create a client around an existing `reqwest` client.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH);

        Self { url, client }
    }

    /// The full endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GenericBackendClient for HttpBackendClient {
    #[instrument(name = "HttpBackendClient::post_chat", skip_all, fields(url = %self.url))]
    async fn post_chat(&self, query: &ChatQuery) -> RelayResult<ChatAnswer> {
        let response = self.client.post(&self.url).json(query).send().await.map_err(|e| RelayError::transport(format!("request to chat backend failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RelayError::transport(format!("failed to read chat backend response: {e}")))?;

        if status != StatusCode::OK {
            return Err(RelayError::status(status.as_u16(), format!("chat backend returned status {status}, body: {body}")));
        }

        let answer = serde_json::from_str::<ChatAnswer>(&body).map_err(|e| RelayError::protocol(format!("failed to decode chat backend response: {e}")))?;

        debug!("Received {} bytes from chat backend", answer.full_response.len());

        Ok(answer)
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    use super::*;
    use crate::base::retry::RetryPolicy;

    fn query() -> ChatQuery {
        ChatQuery { user_id: "U1".to_string(), query: "ping".to_string() }
    }

    fn client(server: &MockServer, max_attempts: u32) -> BackendClient {
        let http = HttpBackendClient::with_client(&server.uri(), reqwest::Client::new());
        BackendClient::new(Arc::new(http), RetryPolicy::new(max_attempts, Duration::from_millis(10)))
    }

    #[tokio::test]
    async fn test_request_answer_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .and(body_json(serde_json::json!({ "user_id": "U1", "query": "ping" })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"full_response":"Pong."}"#))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server, 3).request_answer(&CancellationToken::new(), &query()).await.unwrap();

        assert_eq!(answer.full_response, "Pong.");
    }

    #[tokio::test]
    async fn test_request_answer_recovers_after_transient_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"full_response":"Pong."}"#))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        let answer = client(&server, 1).request_answer(&CancellationToken::new(), &query()).await.unwrap();

        assert_eq!(answer.full_response, "Pong.");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_request_answer_exhausts_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(4)
            .mount(&server)
            .await;

        let err = client(&server, 3).request_answer(&CancellationToken::new(), &query()).await.unwrap_err();

        match err {
            RelayError::ExhaustedRetries { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, RelayError::Protocol { status: Some(500), .. }));
                assert!(source.to_string().contains("boom"));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_answer_rejects_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server, 1).request_answer(&CancellationToken::new(), &query()).await.unwrap_err();

        assert!(matches!(err.last_failure(), RelayError::Protocol { status: None, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Nothing listens on the discard port.
        let http = HttpBackendClient::with_client("http://127.0.0.1:9", reqwest::Client::new());

        let err = http.post_chat(&query()).await.unwrap_err();

        assert!(matches!(err, RelayError::Transport { .. }));
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let http = HttpBackendClient::with_client("http://localhost:8081/", reqwest::Client::new());

        assert_eq!(http.url(), "http://localhost:8081/v1/chat/stream");
    }
}
