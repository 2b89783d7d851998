// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Generative Language API.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication, streaming SSE responses, and transient error retry.

use std::time::Duration;

use astra_core::{AstraError, ChatStream};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::classify::{classify_status, classify_transport};
use crate::sse;
use crate::types::{GenerateContentRequest, GenerateContentResponse, PredictRequest, PredictResponse};

/// HTTP client for Gemini API communication.
///
/// Authenticates with the `x-goog-api-key` header and retries transient
/// errors (429, 500, 503) once after a 1-second delay.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl GeminiClient {
    /// Creates a new API client against `base_url` (no trailing slash).
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, AstraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| AstraError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AstraError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Sends a streaming `streamGenerateContent` request.
    ///
    /// The response body is parsed as SSE; each frame becomes one chat
    /// stream event.
    pub async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ChatStream, AstraError> {
        let url = format!(
            "{}/models/{model}:streamGenerateContent?alt=sse",
            self.base_url
        );

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| classify_transport(&e))?;

            let status = response.status();
            debug!(status = %status, attempt, model, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_chat_stream(response));
            }

            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, &body);
            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error
            .unwrap_or_else(|| AstraError::Unknown("streaming request failed after retries".into())))
    }

    /// Sends a non-streaming `generateContent` request.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AstraError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        self.post_json(&url, request, model).await
    }

    /// Sends an Imagen `predict` request.
    pub async fn predict(
        &self,
        model: &str,
        request: &PredictRequest,
    ) -> Result<PredictResponse, AstraError> {
        let url = format!("{}/models/{model}:predict", self.base_url);
        self.post_json(&url, request, model).await
    }

    async fn post_json<Req, Resp>(
        &self,
        url: &str,
        request: &Req,
        model: &str,
    ) -> Result<Resp, AstraError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| classify_transport(&e))?;

            let status = response.status();
            debug!(status = %status, attempt, model, "response received");

            if status.is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| AstraError::Network(format!("failed to read response body: {e}")))?;
                return serde_json::from_str(&body).map_err(|e| {
                    AstraError::InvalidResponse(format!("failed to parse API response: {e}"))
                });
            }

            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, &body);
            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| AstraError::Unknown("request failed after retries".into())))
    }
}

/// True for HTTP status codes that indicate transient errors worth retrying.
fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
