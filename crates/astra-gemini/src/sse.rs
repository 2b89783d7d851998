// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for `streamGenerateContent?alt=sse` responses.
//!
//! Each SSE `data:` frame carries one partial [`GenerateContentResponse`].
//! Frames are mapped to [`ChatStreamEvent`]s: incremental text, plus any
//! grounding citations attached to the frame. Citation filtering (dropping
//! sources without a URI) is left to the session layer.

use astra_core::{AstraError, ChatStream, ChatStreamEvent, Citation};
use eventsource_stream::Eventsource;
use futures::stream::StreamExt;

use crate::types::GenerateContentResponse;

/// Parses a streaming response body into a [`ChatStream`].
///
/// A frame whose prompt feedback names a block reason terminates the stream
/// with [`AstraError::ContentBlocked`]. Malformed frames fail the stream
/// rather than being skipped, since every frame of this endpoint is
/// meaningful payload.
pub fn parse_chat_stream(response: reqwest::Response) -> ChatStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                if event.data.is_empty() {
                    return None;
                }
                Some(frame_to_event(&event.data))
            }
            Err(e) => Some(Err(AstraError::Network(format!("SSE stream error: {e}")))),
        }
    });

    Box::pin(mapped)
}

fn frame_to_event(data: &str) -> Result<ChatStreamEvent, AstraError> {
    let response: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| AstraError::InvalidResponse(format!("failed to parse stream frame: {e}")))?;

    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(AstraError::ContentBlocked(format!(
                "prompt blocked: {reason}"
            )));
        }
    }

    let citations = response.grounding_chunks().map(|chunks| {
        chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .map(|web| Citation {
                uri: web.uri.clone().unwrap_or_default(),
                title: web.title.clone().unwrap_or_default(),
            })
            .collect::<Vec<_>>()
    });

    Ok(ChatStreamEvent {
        text: response.text(),
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn text_frames_stream_in_order() {
        let sse = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n\
                   data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_chat_stream(response);

        let mut texts = Vec::new();
        while let Some(event) = stream.next().await {
            if let Some(text) = event.unwrap().text {
                texts.push(text);
            }
        }
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn grounding_chunks_surface_as_citations() {
        let sse = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"done\"}]},\
                   \"groundingMetadata\":{\"groundingChunks\":[\
                   {\"web\":{\"uri\":\"https://example.com\",\"title\":\"Example\"}},\
                   {\"web\":{\"title\":\"no uri\"}}]}}]}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_chat_stream(response);

        let event = stream.next().await.unwrap().unwrap();
        let citations = event.citations.unwrap();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].uri, "https://example.com");
        assert_eq!(citations[0].title, "Example");
        // Passed through unfiltered; the session layer drops uri-less sources.
        assert_eq!(citations[1].uri, "");
    }

    #[tokio::test]
    async fn prompt_block_fails_the_stream() {
        let sse = "data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_chat_stream(response);

        let result = stream.next().await.unwrap();
        assert!(matches!(result, Err(AstraError::ContentBlocked(_))));
    }

    #[tokio::test]
    async fn malformed_frame_is_an_invalid_response() {
        let sse = "data: not json\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_chat_stream(response);

        let result = stream.next().await.unwrap();
        assert!(matches!(result, Err(AstraError::InvalidResponse(_))));
    }
}
