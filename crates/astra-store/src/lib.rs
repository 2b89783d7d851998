// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Astra chat assistant.
//!
//! Provides a WAL-mode SQLite key-value store with embedded migrations and
//! a single-writer concurrency model via `tokio-rusqlite`. Records are
//! JSON-serialized; keys follow the scheme in `astra_core::keys`.

pub mod database;
pub mod migrations;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
