// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation of configuration values.
//!
//! A missing API key is deliberately NOT a validation failure: the app must
//! start without one and surface the problem only when the gateway is used.

use crate::diagnostic::ConfigError;
use crate::model::AstraConfig;

/// Validate a loaded configuration.
///
/// Collects every problem rather than stopping at the first.
pub fn validate_config(config: &AstraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".into(),
        });
    }

    for (key, value) in [
        ("api.base_url", &config.api.base_url),
        ("api.chat_model", &config.api.chat_model),
        ("api.image_model", &config.api.image_model),
        ("api.image_edit_model", &config.api.image_edit_model),
        ("api.tts_model", &config.api.tts_model),
        ("api.tts_voice", &config.api.tts_voice),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if !config.api.base_url.starts_with("http") {
        errors.push(ConfigError::Validation {
            message: format!(
                "api.base_url must be an http(s) URL, got `{}`",
                config.api.base_url
            ),
        });
    }

    if let Some(key) = &config.api.api_key {
        if key.chars().any(|c| c.is_whitespace()) {
            errors.push(ConfigError::Validation {
                message: "api.api_key must not contain whitespace".into(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
