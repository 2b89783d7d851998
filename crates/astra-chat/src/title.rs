// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session title derivation.
//!
//! Titles are derived locally from the opening user message instead of
//! spending model quota on every new chat.

use astra_core::ChatSession;

const MAX_TITLE_WORDS: usize = 5;

/// Truncates the first user message to at most five words, appending an
/// ellipsis when words were dropped.
pub fn summarize_title(first_user_message: &str) -> String {
    let words: Vec<&str> = first_user_message.split_whitespace().collect();
    if words.is_empty() {
        return ChatSession::DEFAULT_TITLE.to_string();
    }
    if words.len() <= MAX_TITLE_WORDS {
        words.join(" ")
    } else {
        format!("{}...", words[..MAX_TITLE_WORDS].join(" "))
    }
}
