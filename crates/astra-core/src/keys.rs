// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The store key scheme.
//!
//! Keys are scoped per user and per chat so that concurrent instances
//! signed into different users cannot cross-contaminate storage.

use crate::types::{ChatId, UserId};

/// The active session record (the signed-in `User`).
pub const SESSION_USER: &str = "session-user";

/// Account record for `email` (a `StoredAccount`).
pub fn account(email: &str) -> String {
    format!("account-{email}")
}

/// The chat session list for `user_id` (a `Vec<ChatSession>`).
pub fn chats(user_id: &UserId) -> String {
    format!("chats-{user_id}")
}

/// Free-text input draft for `chat_id`.
pub fn draft(chat_id: &ChatId) -> String {
    format!("draft-{chat_id}")
}

/// Prefix matching every draft key.
pub const DRAFT_PREFIX: &str = "draft-";
