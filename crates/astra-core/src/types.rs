// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Astra workspace.
//!
//! Message content is a tagged union so that a message's content shape
//! always matches its type tag; mismatches are unrepresentable.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ChatId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl MessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user profile as shown in the UI and stored in the active session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// A stored account record: the user profile plus an obfuscated password
/// marker. The marker is NOT cryptographically secure; it exists only for
/// the local credential check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(flatten)]
    pub user: User,
    pub obfuscated_pass: String,
}

/// Persona preset that shapes the system instruction sent to the model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Personality {
    #[default]
    Friendly,
    Professional,
    Humorous,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Error,
}

/// A web source the model's answer drew upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// Display descriptor for a file attached to a message. The raw bytes are
/// never stored here; they travel only in the gateway request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
}

/// Message payload, tagged by content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Recipe {
        name: String,
        description: String,
        ingredients: Vec<String>,
        instructions: Vec<String>,
    },
    Story {
        segment: String,
        choices: Vec<String>,
    },
    Image {
        image_url: String,
        prompt: String,
    },
    EditedImage {
        edited_image_url: String,
        description: String,
    },
    Error {
        text: String,
    },
}

impl MessageContent {
    /// The plain text of a `Text` payload, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// One entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: MessageContent,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// True while assistant output is still arriving.
    #[serde(default)]
    pub streaming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    /// A user text turn, optionally carrying an attachment descriptor.
    pub fn user_text(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::User,
            content: MessageContent::Text { text: text.into() },
            timestamp: now_millis(),
            streaming: false,
            suggestions: None,
            citations: None,
            attachment,
        }
    }

    /// The assistant placeholder created when a turn begins: empty content,
    /// streaming flag set.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::Assistant,
            content: MessageContent::Text {
                text: String::new(),
            },
            timestamp: now_millis(),
            streaming: true,
            suggestions: None,
            citations: None,
            attachment: None,
        }
    }

    /// A terminal error entry that replaces a failed assistant placeholder.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::Error,
            content: MessageContent::Error { text: text.into() },
            timestamp: now_millis(),
            streaming: false,
            suggestions: None,
            citations: None,
            attachment: None,
        }
    }

    /// A pre-built structured message (generated image, edited image, recipe,
    /// story) appended on behalf of the user.
    pub fn structured(content: MessageContent) -> Self {
        Self {
            id: MessageId::generate(),
            role: MessageRole::User,
            content,
            timestamp: now_millis(),
            streaming: false,
            suggestions: None,
            citations: None,
            attachment: None,
        }
    }
}

/// One ongoing conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: ChatId,
    pub title: String,
    pub messages: Vec<Message>,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
    pub personality: Personality,
    #[serde(default)]
    pub use_search: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl ChatSession {
    /// The default title for a session whose first exchange has not happened.
    pub const DEFAULT_TITLE: &'static str = "New Chat";

    pub fn new() -> Self {
        Self {
            id: ChatId::generate(),
            title: Self::DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now_millis(),
            personality: Personality::default(),
            use_search: false,
            pinned: false,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// --- Gateway request/response types ---

/// Role of a history turn sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// One text-bearing turn of prior conversation, as sent to the model.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

/// An inline binary attachment travelling with a chat request.
#[derive(Debug, Clone)]
pub struct AttachmentData {
    pub name: String,
    pub mime_type: String,
    /// Base64 payload, without any data-URL prefix.
    pub data: String,
}

/// One element of a streaming chat response.
///
/// Each event may carry incremental text; the terminal event may carry the
/// grounding citations collected for the whole reply.
#[derive(Debug, Clone, Default)]
pub struct ChatStreamEvent {
    pub text: Option<String>,
    pub citations: Option<Vec<Citation>>,
}

/// Requested aspect ratio for image generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl AspectRatio {
    /// The wire encoding expected by the image model.
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

/// Result of an image edit: the new image plus the model's one-line
/// description of the changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEdit {
    /// `data:<mime>;base64,<payload>` URL for display.
    pub image_data_url: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn personality_round_trips_through_strings() {
        for p in [
            Personality::Friendly,
            Personality::Professional,
            Personality::Humorous,
        ] {
            let s = p.to_string();
            assert_eq!(Personality::from_str(&s).unwrap(), p);
        }
        assert_eq!(Personality::default(), Personality::Friendly);
    }

    #[test]
    fn message_content_tag_matches_shape() {
        let msg = Message::structured(MessageContent::EditedImage {
            edited_image_url: "data:image/png;base64,AAAA".into(),
            description: "Brightened the sky.".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"]["type"], "edited-image");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back.content, msg.content);
    }

    #[test]
    fn assistant_placeholder_starts_empty_and_streaming() {
        let msg = Message::assistant_placeholder();
        assert!(msg.streaming);
        assert_eq!(msg.content.as_text(), Some(""));
        assert_eq!(msg.role, MessageRole::Assistant);
    }

    #[test]
    fn session_defaults_match_new_chat_semantics() {
        let session = ChatSession::new();
        assert_eq!(session.title, "New Chat");
        assert!(session.messages.is_empty());
        assert_eq!(session.personality, Personality::Friendly);
        assert!(!session.use_search);
        assert!(!session.pinned);
    }

    #[test]
    fn session_deserializes_without_optional_flags() {
        // Records written before the pinned flag existed must still load.
        let json =
            r#"{"id":"c1","title":"New Chat","messages":[],"created_at":1,"personality":"friendly"}"#;
        let session: ChatSession = serde_json::from_str(json).unwrap();
        assert!(!session.pinned);
        assert!(!session.use_search);
    }

    #[test]
    fn aspect_ratio_wire_encoding() {
        assert_eq!(AspectRatio::Square.as_str(), "1:1");
        assert_eq!(AspectRatio::Landscape.as_str(), "16:9");
        assert_eq!(AspectRatio::Portrait.as_str(), "9:16");
    }
}
