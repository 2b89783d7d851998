// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suggestion markup extraction.
//!
//! The model is instructed to wrap follow-up prompt ideas in
//! `[SUGGESTION]...[/SUGGESTION]` tags. Those spans are collected in order
//! of appearance and stripped from the visible reply.

use std::sync::LazyLock;

use regex::Regex;

// `.` does not match newlines, so a suggestion never spans lines.
static SUGGESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[SUGGESTION\](.*?)\[/SUGGESTION\]").unwrap()
});

/// A model reply split into display text and follow-up suggestions.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub text: String,
    pub suggestions: Vec<String>,
}

/// Strips suggestion tags out of `raw` and collects their contents.
///
/// Idempotent: running it again on the cleaned text yields no further
/// suggestions and unchanged text.
pub fn extract_suggestions(raw: &str) -> ParsedReply {
    let suggestions: Vec<String> = SUGGESTION_RE
        .captures_iter(raw)
        .map(|captures| captures[1].trim().to_string())
        .filter(|suggestion| !suggestion.is_empty())
        .collect();
    let text = SUGGESTION_RE.replace_all(raw, "").trim().to_string();

    ParsedReply { text, suggestions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_suggestions_in_order() {
        let parsed = extract_suggestions(
            "Hi there! [SUGGESTION]Tell me more[/SUGGESTION][SUGGESTION]Another idea[/SUGGESTION]",
        );
        assert_eq!(parsed.text, "Hi there!");
        assert_eq!(parsed.suggestions, vec!["Tell me more", "Another idea"]);
    }

    #[test]
    fn no_tags_means_no_suggestions() {
        let parsed = extract_suggestions("Just a plain answer.");
        assert_eq!(parsed.text, "Just a plain answer.");
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_suggestions("Answer [SUGGESTION]Go deeper[/SUGGESTION]");
        let second = extract_suggestions(&first.text);
        assert_eq!(second.text, first.text);
        assert!(second.suggestions.is_empty());
    }

    #[test]
    fn whitespace_inside_tags_is_trimmed() {
        let parsed = extract_suggestions("Done. [SUGGESTION]  Show an example  [/SUGGESTION]");
        assert_eq!(parsed.suggestions, vec!["Show an example"]);
    }

    #[test]
    fn empty_tags_are_dropped() {
        let parsed = extract_suggestions("Done. [SUGGESTION][/SUGGESTION]");
        assert_eq!(parsed.text, "Done.");
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn unclosed_tag_is_left_in_place() {
        let parsed = extract_suggestions("Text [SUGGESTION]dangling");
        assert_eq!(parsed.text, "Text [SUGGESTION]dangling");
        assert!(parsed.suggestions.is_empty());
    }

    #[test]
    fn tags_do_not_span_newlines() {
        let parsed = extract_suggestions("a [SUGGESTION]first\nsecond[/SUGGESTION] b");
        assert!(parsed.suggestions.is_empty());
    }
}
