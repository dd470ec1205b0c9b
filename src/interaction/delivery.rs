//! Simulated streaming: reveal a complete answer one sentence at a time.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        error::RelayError,
        text::split_into_sentences,
        types::{DeliveryHandle, RelayResult},
    },
    service::chat::ChatClient,
};

/// Marker appended to a partial buffer while more content is coming.
pub const CONTINUATION_MARKER: &str = "...";

/// Attribution appended to the final message.
pub const FOOTER: &str = "\n\n_Powered by ChatRelay_";

/// Default pause between incremental updates.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// The successive texts shown while an answer is revealed.
///
/// Buffer `i` holds sentences `0..=i`. The newest sentence gets the continuation
/// marker appended as is, unless it ends the answer. Earlier sentences are joined
/// by the marker alone: a trailing `.` folds into it, so the separator is always
/// exactly `...`.
pub fn progressive_buffers(full_answer: &str) -> Vec<String> {
    let sentences = split_into_sentences(full_answer);
    let mut joined = String::with_capacity(full_answer.len() + sentences.len() * CONTINUATION_MARKER.len());

    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let mut buffer = format!("{joined}{sentence}");
            if i + 1 < sentences.len() {
                buffer.push_str(CONTINUATION_MARKER);
            }

            joined.push_str(sentence.strip_suffix('.').unwrap_or(sentence));
            joined.push_str(CONTINUATION_MARKER);

            buffer
        })
        .collect()
}

/// Delivers an answer to a message through paced, incremental updates.
#[derive(Debug, Clone)]
pub struct ResponseDeliverer {
    pacing: Duration,
    footer: String,
}

impl Default for ResponseDeliverer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl ResponseDeliverer {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing, footer: FOOTER.to_string() }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// The text of the final update for `full_answer`.
    pub fn final_text(&self, full_answer: &str) -> String {
        format!("{full_answer}{}", self.footer)
    }

    /// Reveals `full_answer` in the message addressed by `handle`.
    ///
    /// Intermediate updates are best-effort: a failure is logged and delivery moves
    /// on. Only a failure of the final update (the untouched answer plus footer)
    /// fails the delivery.
    #[instrument(name = "ResponseDeliverer::deliver", skip_all, fields(key = %handle.key, ts = %handle.message_ts))]
    pub async fn deliver(&self, cancel: &CancellationToken, chat: &ChatClient, handle: &DeliveryHandle, full_answer: &str) -> RelayResult<()> {
        let buffers = progressive_buffers(full_answer);
        let total = buffers.len();

        info!("Delivering answer in {} chunks", total);

        for (i, buffer) in buffers.iter().enumerate() {
            match chat.update(cancel, handle, buffer).await {
                Ok(()) => {}
                Err(RelayError::Cancelled) => return Err(RelayError::Cancelled),
                Err(err) => error!("Failed to deliver chunk {}/{}: {}", i + 1, total, err),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }

        chat.update(cancel, handle, &self.final_text(full_answer)).await.inspect_err(|err| {
            warn!("Failed to deliver final message: {}", err);
        })
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        base::{
            retry::RetryPolicy,
            types::{ConversationKey, Void},
        },
        interaction::relay::Relay,
        service::chat::GenericChatClient,
    };

    /// Records every update and fails the ones whose text matches `fail_on`.
    #[derive(Default)]
    struct RecordingChat {
        updates: Mutex<Vec<String>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl GenericChatClient for RecordingChat {
        fn bot_user_id(&self) -> &str {
            "UBOT"
        }

        async fn start(&self, _relay: Relay, _cancel: CancellationToken) -> Void {
            Ok(())
        }

        async fn post_message(&self, _channel_id: &str, _text: &str) -> RelayResult<String> {
            Ok("1.0".to_string())
        }

        async fn update_message(&self, _channel_id: &str, _message_ts: &str, text: &str) -> RelayResult<()> {
            self.updates.lock().unwrap().push(text.to_string());

            if self.fail_on.iter().any(|f| f == text) {
                return Err(RelayError::transport("connection reset"));
            }

            Ok(())
        }
    }

    fn handle() -> DeliveryHandle {
        DeliveryHandle::new(ConversationKey::new("C1", "U1"), "1.0")
    }

    fn chat(recording: Arc<RecordingChat>, max_attempts: u32) -> ChatClient {
        ChatClient::new(recording, RetryPolicy::new(max_attempts, Duration::from_millis(100)))
    }

    #[test]
    fn test_progressive_buffers() {
        assert_eq!(
            progressive_buffers("Hello there. How are you? Fine!"),
            vec!["Hello there....", "Hello there...How are you?...", "Hello there...How are you?...Fine!"]
        );
        assert_eq!(progressive_buffers("Pong."), vec!["Pong."]);
        assert_eq!(progressive_buffers("One. Two. Three."), vec!["One....", "One...Two....", "One...Two...Three."]);
        assert_eq!(progressive_buffers("Really? Yes."), vec!["Really?...", "Really?...Yes."]);
        assert!(progressive_buffers("").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_sends_buffers_then_final() {
        let recording = Arc::new(RecordingChat::default());
        let deliverer = ResponseDeliverer::default();

        deliverer.deliver(&CancellationToken::new(), &chat(recording.clone(), 0), &handle(), "Hello there. How are you? Fine!").await.unwrap();

        assert_eq!(
            *recording.updates.lock().unwrap(),
            vec![
                "Hello there....",
                "Hello there...How are you?...",
                "Hello there...How are you?...Fine!",
                "Hello there. How are you? Fine!\n\n_Powered by ChatRelay_",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_paces_updates() {
        let recording = Arc::new(RecordingChat::default());
        let deliverer = ResponseDeliverer::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        deliverer.deliver(&CancellationToken::new(), &chat(recording, 0), &handle(), "One. Two. Three.").await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_failure_is_tolerated() {
        let recording = Arc::new(RecordingChat {
            fail_on: vec!["One....".to_string()],
            ..Default::default()
        });

        let result = ResponseDeliverer::default().deliver(&CancellationToken::new(), &chat(recording.clone(), 1), &handle(), "One. Two.").await;

        assert!(result.is_ok());

        // The failing chunk is retried once, then delivery moves on.
        assert_eq!(*recording.updates.lock().unwrap(), vec!["One....", "One....", "One...Two.", "One. Two.\n\n_Powered by ChatRelay_"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_failure_fails_delivery() {
        let recording = Arc::new(RecordingChat {
            fail_on: vec!["One. Two.\n\n_Powered by ChatRelay_".to_string()],
            ..Default::default()
        });

        let result = ResponseDeliverer::default().deliver(&CancellationToken::new(), &chat(recording.clone(), 2), &handle(), "One. Two.").await;

        assert!(matches!(result, Err(RelayError::ExhaustedRetries { attempts: 3, .. })));
        assert_eq!(recording.updates.lock().unwrap().len(), 2 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_answer_only_sends_final() {
        let recording = Arc::new(RecordingChat::default());

        ResponseDeliverer::default().deliver(&CancellationToken::new(), &chat(recording.clone(), 0), &handle(), "").await.unwrap();

        assert_eq!(*recording.updates.lock().unwrap(), vec!["\n\n_Powered by ChatRelay_"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_delivery() {
        let recording = Arc::new(RecordingChat::default());
        let cancel = CancellationToken::new();
        let deliverer = ResponseDeliverer::default();

        let task = {
            let cancel = cancel.clone();
            let chat = chat(recording.clone(), 0);
            tokio::spawn(async move { deliverer.deliver(&cancel, &chat, &handle(), "One. Two. Three. Four.").await })
        };

        tokio::time::sleep(Duration::from_millis(750)).await;
        cancel.cancel();

        assert!(matches!(task.await.unwrap(), Err(RelayError::Cancelled)));
        assert_eq!(recording.updates.lock().unwrap().len(), 2);
    }
}
