// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Astra chat assistant.
//!
//! This crate provides the error taxonomy, the domain model (sessions,
//! messages, tagged content payloads), and the trait seams to the remote
//! generative model service and the persistent store. The other workspace
//! crates implement or consume these definitions.

pub mod error;
pub mod keys;
pub mod traits;
pub mod types;

pub use error::AstraError;
pub use traits::{ChatGateway, ChatStream, KeyValueStore};
pub use types::{
    AspectRatio, Attachment, AttachmentData, ChatId, ChatSession, ChatStreamEvent, ChatTurn,
    Citation, ImageEdit, Message, MessageContent, MessageId, MessageRole, Personality,
    StoredAccount, TurnRole, User, UserId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_cover_the_taxonomy() {
        let _ = AstraError::Config("missing key".into());
        let _ = AstraError::InvalidCredentials("401".into());
        let _ = AstraError::RateLimited("429".into());
        let _ = AstraError::ContentBlocked("SAFETY".into());
        let _ = AstraError::ServiceUnavailable("503".into());
        let _ = AstraError::Network("reset".into());
        let _ = AstraError::InvalidResponse("no image".into());
        let _ = AstraError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _ = AstraError::Unknown("?".into());
    }

    #[test]
    fn trait_objects_are_constructible() {
        fn _assert_gateway(_: &dyn ChatGateway) {}
        fn _assert_store(_: &dyn KeyValueStore) {}
    }
}
