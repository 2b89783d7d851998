// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password obfuscation for local account records.
//!
//! This is NOT a cryptographic hash. It exists only so the local credential
//! check does not store the raw password; an application with a real server
//! must use proper password hashing instead.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Obfuscate a password: reverse the string, then base64-encode.
pub fn obfuscate(password: &str) -> String {
    let reversed: String = password.chars().rev().collect();
    STANDARD.encode(reversed.as_bytes())
}

/// Compare a candidate password against a stored marker.
pub fn matches(candidate: &str, marker: &str) -> bool {
    obfuscate(candidate) == marker
}
