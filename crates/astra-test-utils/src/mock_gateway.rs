// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock [`ChatGateway`] for deterministic testing.
//!
//! Scripted responses are popped from a FIFO queue, enabling fast,
//! CI-runnable tests without external API calls. A `Channel` script hands
//! chunk pacing to the test, which is how stream-abandonment timing is
//! exercised.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::{mpsc, Mutex};

use astra_core::{
    AspectRatio, AstraError, AttachmentData, ChatGateway, ChatStream, ChatStreamEvent, ChatTurn,
    Citation, ImageEdit, Personality,
};

/// One scripted reply for `stream_chat`.
pub enum ChatScript {
    /// Yield these events in order, then end the stream.
    Events(Vec<ChatStreamEvent>),
    /// Fail the `stream_chat` call itself.
    Refuse(AstraError),
    /// Yield events fed through the channel until the sender is dropped.
    Channel(mpsc::UnboundedReceiver<Result<ChatStreamEvent, AstraError>>),
}

/// Arguments of a recorded `stream_chat` call.
pub struct RecordedChat {
    pub turns: Vec<ChatTurn>,
    pub personality: Personality,
    pub use_search: bool,
    pub attachment: Option<AttachmentData>,
}

/// A mock gateway that returns pre-configured responses.
///
/// When the chat script queue is empty, a single-chunk "mock response"
/// stream is returned.
pub struct MockGateway {
    chat_scripts: Mutex<VecDeque<ChatScript>>,
    speech_errors: Mutex<VecDeque<AstraError>>,
    recorded: Arc<Mutex<Vec<RecordedChat>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            chat_scripts: Mutex::new(VecDeque::new()),
            speech_errors: Mutex::new(VecDeque::new()),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply made of plain text chunks, ending with `citations`.
    pub async fn push_chunks(&self, chunks: &[&str], citations: Option<Vec<Citation>>) {
        let mut events: Vec<ChatStreamEvent> = chunks
            .iter()
            .map(|text| ChatStreamEvent {
                text: Some((*text).to_string()),
                citations: None,
            })
            .collect();
        if let Some(citations) = citations {
            events.push(ChatStreamEvent {
                text: None,
                citations: Some(citations),
            });
        }
        self.chat_scripts
            .lock()
            .await
            .push_back(ChatScript::Events(events));
    }

    /// Queue a `stream_chat` failure.
    pub async fn push_refusal(&self, error: AstraError) {
        self.chat_scripts
            .lock()
            .await
            .push_back(ChatScript::Refuse(error));
    }

    /// Queue a channel-driven reply; the returned sender paces the chunks.
    pub async fn push_channel(
        &self,
    ) -> mpsc::UnboundedSender<Result<ChatStreamEvent, AstraError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.chat_scripts
            .lock()
            .await
            .push_back(ChatScript::Channel(rx));
        tx
    }

    /// Queue a `synthesize_speech` failure.
    pub async fn push_speech_error(&self, error: AstraError) {
        self.speech_errors.lock().await.push_back(error);
    }

    /// Every `stream_chat` call recorded so far.
    pub async fn recorded_chats(&self) -> Vec<RecordedChat> {
        std::mem::take(&mut *self.recorded.lock().await)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn stream_chat(
        &self,
        turns: Vec<ChatTurn>,
        personality: Personality,
        use_search: bool,
        attachment: Option<AttachmentData>,
    ) -> Result<ChatStream, AstraError> {
        self.recorded.lock().await.push(RecordedChat {
            turns,
            personality,
            use_search,
            attachment,
        });

        let script = self.chat_scripts.lock().await.pop_front();
        match script {
            Some(ChatScript::Events(events)) => {
                Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
            }
            Some(ChatScript::Refuse(error)) => Err(error),
            Some(ChatScript::Channel(rx)) => {
                let stream = stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                });
                Ok(Box::pin(stream))
            }
            None => Ok(Box::pin(stream::iter([Ok(ChatStreamEvent {
                text: Some("mock response".to_string()),
                citations: None,
            })]))),
        }
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _aspect_ratio: AspectRatio,
    ) -> Result<String, AstraError> {
        Ok("data:image/png;base64,bW9jaw==".to_string())
    }

    async fn edit_image(
        &self,
        _prompt: &str,
        _image_b64: &str,
        mime_type: &str,
    ) -> Result<ImageEdit, AstraError> {
        Ok(ImageEdit {
            image_data_url: format!("data:{mime_type};base64,bW9jaw=="),
            description: "Mock edit applied.".to_string(),
        })
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Vec<u8>, AstraError> {
        if let Some(error) = self.speech_errors.lock().await.pop_front() {
            return Err(error);
        }
        // 100 ms of silence at 24 kHz, 16-bit mono.
        Ok(vec![0u8; 4800])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn scripted_chunks_come_back_in_order() {
        let gateway = MockGateway::new();
        gateway.push_chunks(&["Hello", " world"], None).await;

        let mut stream = gateway
            .stream_chat(vec![], Personality::Friendly, false, None)
            .await
            .unwrap();

        let mut texts = Vec::new();
        while let Some(event) = stream.next().await {
            if let Some(text) = event.unwrap().text {
                texts.push(text);
            }
        }
        assert_eq!(texts, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn empty_queue_falls_back_to_default_reply() {
        let gateway = MockGateway::new();
        let mut stream = gateway
            .stream_chat(vec![], Personality::Friendly, false, None)
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.text.as_deref(), Some("mock response"));
    }

    #[tokio::test]
    async fn refusal_script_fails_the_call() {
        let gateway = MockGateway::new();
        gateway
            .push_refusal(AstraError::RateLimited("scripted".into()))
            .await;
        let result = gateway
            .stream_chat(vec![], Personality::Friendly, false, None)
            .await;
        assert!(matches!(result, Err(AstraError::RateLimited(_))));
    }

    #[tokio::test]
    async fn channel_script_is_paced_by_the_sender() {
        let gateway = MockGateway::new();
        let tx = gateway.push_channel().await;

        let mut stream = gateway
            .stream_chat(vec![], Personality::Friendly, false, None)
            .await
            .unwrap();

        tx.send(Ok(ChatStreamEvent {
            text: Some("first".into()),
            citations: None,
        }))
        .unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap().text.as_deref(),
            Some("first")
        );

        drop(tx);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let gateway = MockGateway::new();
        let _ = gateway
            .stream_chat(vec![], Personality::Humorous, true, None)
            .await
            .unwrap();
        let recorded = gateway.recorded_chats().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].personality, Personality::Humorous);
        assert!(recorded[0].use_search);
    }
}
