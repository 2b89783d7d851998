// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence trait.

use async_trait::async_trait;

use crate::error::AstraError;

/// Client-side key-value storage. Values are JSON-serialized records.
///
/// All mutation happens from the single UI task, so implementations need
/// no cross-key transactional guarantees; they must only keep each write
/// scoped to its exact key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AstraError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), AstraError>;

    async fn remove(&self, key: &str) -> Result<(), AstraError>;

    /// Removes every key starting with `prefix` (bulk draft cleanup).
    async fn remove_prefix(&self, prefix: &str) -> Result<(), AstraError>;
}
