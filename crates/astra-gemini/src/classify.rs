// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps HTTP and transport failures onto the [`AstraError`] taxonomy.
//!
//! The Generative Language API reports most failure causes in the error
//! body's `message`/`status` strings rather than the HTTP status alone, so
//! classification inspects both.

use astra_core::AstraError;
use reqwest::StatusCode;

use crate::types::ApiErrorResponse;

/// Classifies a non-2xx response into an [`AstraError`] variant.
///
/// The raw body is parsed as the API error envelope when possible; the
/// classified variant keeps the technical detail for logs while
/// `user_message()` stays friendly.
pub fn classify_status(status: StatusCode, body: &str) -> AstraError {
    let detail = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(envelope) => {
            let status_tag = envelope.error.status.unwrap_or_default();
            format!("HTTP {status} {status_tag}: {}", envelope.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    };
    let haystack = detail.to_lowercase();

    if haystack.contains("api key not valid")
        || haystack.contains("api_key_invalid")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return AstraError::InvalidCredentials(detail);
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || haystack.contains("resource_exhausted")
        || haystack.contains("rate limit")
        || haystack.contains("quota")
    {
        return AstraError::RateLimited(detail);
    }
    if haystack.contains("safety") || haystack.contains("blocked") {
        return AstraError::ContentBlocked(detail);
    }
    if status.is_server_error() || haystack.contains("unavailable") || haystack.contains("overloaded")
    {
        return AstraError::ServiceUnavailable(detail);
    }
    AstraError::Unknown(detail)
}

/// Classifies a reqwest transport error.
pub fn classify_transport(error: &reqwest::Error) -> AstraError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        AstraError::Network(error.to_string())
    } else {
        AstraError::Unknown(error.to_string())
    }
}
