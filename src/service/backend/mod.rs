//! Integration with the chat backend that computes answers.
//!
//! The backend contract is "compute the full answer, return it once":
//! `POST /v1/chat/stream` with a [`ChatQuery`] body, answered by a [`ChatAnswer`].
//!
//! The module defines the `GenericBackendClient` trait for a single attempt at
//! that call, and the cloneable `BackendClient` that applies the backend retry
//! policy on top of any implementation.

pub mod http;
pub mod mock;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::base::{
    retry::{RetryExecutor, RetryPolicy},
    types::{ChatAnswer, ChatQuery, RelayResult},
};

/// Path of the chat endpoint, relative to the backend base URL.
pub const CHAT_PATH: &str = "/v1/chat/stream";

// Traits.

/// Generic backend trait that clients must implement.
///
/// Implementations make exactly one attempt per call; retrying is the job of
/// [`BackendClient`].
#[async_trait]
pub trait GenericBackendClient: Send + Sync + 'static {
    /// Send one chat query and decode the full answer.
    ///
    /// Network failures are reported as `Transport`, non-success statuses and
    /// undecodable bodies as `Protocol`.
    async fn post_chat(&self, query: &ChatQuery) -> RelayResult<ChatAnswer>;
}

// Structs.

/// Backend client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<dyn GenericBackendClient>,
    retry: RetryExecutor,
}

impl Deref for BackendClient {
    type Target = dyn GenericBackendClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl BackendClient {
    pub fn new(inner: Arc<dyn GenericBackendClient>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            retry: RetryExecutor::new(policy),
        }
    }

    /// Ask the backend for an answer, retrying every failure under the backend policy.
    #[instrument(name = "BackendClient::request_answer", skip_all, fields(user_id = %query.user_id))]
    pub async fn request_answer(&self, cancel: &CancellationToken, query: &ChatQuery) -> RelayResult<ChatAnswer> {
        let total = self.retry.policy().total_attempts();
        let mut attempt = 0;

        self.retry
            .execute(cancel, || {
                attempt += 1;
                let attempt = attempt;

                async move {
                    let result = self.inner.post_chat(query).await;

                    if let Err(err) = &result {
                        warn!("Backend attempt {attempt}/{total} failed: {err}");
                    }

                    result
                }
            })
            .await
    }
}
