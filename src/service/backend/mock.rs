//! A local stand-in for the chat backend.
//!
//! Serves `POST /v1/chat/stream`, waits for a simulated processing delay and
//! answers with a canned response mentioning the user and query.

use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::base::types::{ChatAnswer, ChatQuery};

use super::CHAT_PATH;

/// Settings for the simulated backend.
#[derive(Debug, Clone, Copy)]
pub struct MockBackend {
    /// Minimum processing delay.
    pub min_delay: Duration,
    /// Upper bound of the random delay added on top of `min_delay`.
    pub jitter: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            jitter: Duration::from_millis(1000),
        }
    }
}

impl MockBackend {
    /// A backend that answers immediately.
    pub fn instant() -> Self {
        Self {
            min_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Builds the axum router.
    pub fn router(self) -> Router {
        Router::new().route(CHAT_PATH, post(handle_chat)).with_state(self)
    }

    fn processing_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.min_delay;
        }

        self.min_delay + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }
}

/// The canned answer for a query.
pub fn mock_answer(query: &ChatQuery) -> ChatAnswer {
    ChatAnswer {
        full_response: format!(
            "Hello {}! Your query about '{}' has been processed by the mock backend. This is a detailed and insightful response demonstrating efficient handling of concurrent requests and robust error management. We believe in providing scalable solutions with comprehensive observability features.",
            query.user_id, query.query
        ),
    }
}

#[instrument(name = "MockBackend::handle_chat", skip_all)]
async fn handle_chat(State(backend): State<MockBackend>, body: String) -> impl IntoResponse {
    let query = match serde_json::from_str::<ChatQuery>(&body) {
        Ok(query) => query,
        Err(e) => {
            warn!("Rejecting invalid JSON payload: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON payload").into_response();
        }
    };

    info!(user_id = %query.user_id, query = %query.query, "Received chat request");

    let delay = backend.processing_delay();
    tokio::time::sleep(delay).await;

    info!("Answered after {:?}", delay);

    Json(mock_answer(&query)).into_response()
}

// Tests.
