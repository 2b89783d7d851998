// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared across the Astra workspace.

use thiserror::Error;

/// The primary error type used across Astra's gateway, storage, and session
/// layers.
///
/// Gateway implementations classify transport failures into these variants;
/// the chat session manager converts them into inline error messages rather
/// than letting them escape to callers.
#[derive(Debug, Error)]
pub enum AstraError {
    /// Configuration errors (missing API key, invalid TOML, bad field values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The service rejected the credential.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Too many requests or quota exhausted.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The request was refused by the service's content safety policy.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The remote service is down or overloaded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered, but the payload was not usable
    /// (e.g., an image edit that returned no image).
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Persistent store errors (connection, query, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Anything that does not fit the taxonomy.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl AstraError {
    /// A human-readable description suitable for display inside the
    /// conversation log or a modal status area.
    pub fn user_message(&self) -> String {
        match self {
            AstraError::Config(_) => {
                "API key not configured. Cannot connect to the Gemini service.".to_string()
            }
            AstraError::InvalidCredentials(_) => {
                "Your API key seems to be invalid. Please ensure it's configured correctly."
                    .to_string()
            }
            AstraError::RateLimited(_) => {
                "You've made too many requests in a short period or exceeded your quota. \
                 Please wait a moment and try again."
                    .to_string()
            }
            AstraError::ContentBlocked(_) => {
                "Your request was blocked due to the content safety policy. \
                 Please adjust your prompt and try again."
                    .to_string()
            }
            AstraError::ServiceUnavailable(_) => {
                "The AI service is currently experiencing technical difficulties. \
                 Please try again later."
                    .to_string()
            }
            AstraError::Network(_) => {
                "A network error occurred. Please check your internet connection and try again."
                    .to_string()
            }
            AstraError::InvalidResponse(msg) => msg.clone(),
            AstraError::Storage { .. } | AstraError::Unknown(_) => {
                "An unexpected error occurred. If the problem persists, please try again later."
                    .to_string()
            }
        }
    }
}
