// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./astra.toml` > `~/.config/astra/astra.toml`
//! > `/etc/astra/astra.toml`, with environment variable overrides via the
//! `ASTRA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AstraConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/astra/astra.toml` (system-wide)
/// 3. `~/.config/astra/astra.toml` (user XDG config)
/// 4. `./astra.toml` (local directory)
/// 5. `ASTRA_*` environment variables
pub fn load_config() -> Result<AstraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AstraConfig::default()))
        .merge(Toml::file("/etc/astra/astra.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("astra/astra.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("astra.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AstraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AstraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AstraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AstraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `ASTRA_API_CHAT_MODEL` must map to
/// `api.chat_model`, not `api.chat.model`. `ASTRA_API_KEY` is special-cased
/// as shorthand for `api.api_key`.
fn env_provider() -> Env {
    Env::prefixed("ASTRA_").map(|key| {
        let key_str = key.as_str();
        if key_str == "api_key" {
            return "api.api_key".into();
        }
        let mapped = key_str
            .replacen("api_", "api.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
