// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`KeyValueStore`] for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use astra_core::{AstraError, KeyValueStore};

/// HashMap-backed store with the same observable behavior as the SQLite one.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every key currently present (assertion helper).
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AstraError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AstraError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AstraError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<(), AstraError> {
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
