// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway trait for the remote generative model service.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::AstraError;
use crate::types::{
    AspectRatio, AttachmentData, ChatStreamEvent, ChatTurn, ImageEdit, Personality,
};

/// A lazy, finite, non-restartable sequence of chat response events.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, AstraError>> + Send>>;

/// Stateless façade over the remote generative model.
///
/// The session manager depends on this trait, never on a concrete client,
/// so tests can substitute a scripted gateway.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Starts a streaming chat completion for the given history.
    ///
    /// `turns` is the full prior conversation filtered to text-bearing
    /// user/assistant turns, latest turn last. The attachment, if present,
    /// is embedded inline alongside the latest turn's text.
    async fn stream_chat(
        &self,
        turns: Vec<ChatTurn>,
        personality: Personality,
        use_search: bool,
        attachment: Option<AttachmentData>,
    ) -> Result<ChatStream, AstraError>;

    /// Generates a single image; returns a `data:image/png;base64,...` URL.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, AstraError>;

    /// Edits an image according to `prompt`.
    ///
    /// Fails with [`AstraError::InvalidResponse`] when the response carries
    /// no image payload (text-only refusals happen).
    async fn edit_image(
        &self,
        prompt: &str,
        image_b64: &str,
        mime_type: &str,
    ) -> Result<ImageEdit, AstraError>;

    /// Synthesizes speech for `text`; returns raw 16-bit PCM at 24 kHz.
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, AstraError>;
}
