// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`KeyValueStore`] trait.

use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

use astra_core::{AstraError, KeyValueStore};

use crate::database::{map_tr_err, Database};

/// SQLite-backed key-value store.
///
/// One row per key; writes go through the single background writer thread.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at `path`, creating the schema if needed.
    pub async fn open(path: &str) -> Result<Self, AstraError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Open the store at the configured database path.
    pub async fn from_config(
        config: &astra_config::model::StorageConfig,
    ) -> Result<Self, AstraError> {
        Self::open(&config.database_path).await
    }

    /// Open an in-memory store (tests and throwaway sessions).
    pub async fn open_in_memory() -> Result<Self, AstraError> {
        let db = Database::open_in_memory().await?;
        Ok(Self { db })
    }

    /// Checkpoint and release the underlying database.
    pub async fn close(&self) -> Result<(), AstraError> {
        self.db.close().await
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AstraError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let result = conn.query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AstraError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at)
                     VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove(&self, key: &str) -> Result<(), AstraError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<(), AstraError> {
        // LIKE special characters in keys are escaped so a prefix such as
        // "draft-" only matches literally.
        let pattern = format!(
            "{}%",
            prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        self.db
            .connection()
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM kv WHERE key LIKE ?1 ESCAPE '\\'",
                    params![pattern],
                )?;
                debug!(removed, "removed keys by prefix");
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_roundtrip() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        assert_eq!(store.get("session-user").await.unwrap(), None);

        store.put("session-user", r#"{"id":"u1"}"#).await.unwrap();
        assert_eq!(
            store.get("session-user").await.unwrap().as_deref(),
            Some(r#"{"id":"u1"}"#)
        );

        store.remove("session-user").await.unwrap();
        assert_eq!(store.get("session-user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("chats-u1", "[]").await.unwrap();
        store.put("chats-u1", r#"[{"id":"c1"}]"#).await.unwrap();
        assert_eq!(
            store.get("chats-u1").await.unwrap().as_deref(),
            Some(r#"[{"id":"c1"}]"#)
        );
    }

    #[tokio::test]
    async fn remove_prefix_only_touches_matching_keys() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("draft-c1", "hello").await.unwrap();
        store.put("draft-c2", "world").await.unwrap();
        store.put("chats-u1", "[]").await.unwrap();

        store.remove_prefix("draft-").await.unwrap();

        assert_eq!(store.get("draft-c1").await.unwrap(), None);
        assert_eq!(store.get("draft-c2").await.unwrap(), None);
        assert!(store.get("chats-u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn keys_scoped_to_different_users_do_not_collide() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.put("chats-alice", r#"["a"]"#).await.unwrap();
        store.put("chats-bob", r#"["b"]"#).await.unwrap();
        assert_eq!(
            store.get("chats-alice").await.unwrap().as_deref(),
            Some(r#"["a"]"#)
        );
        assert_eq!(
            store.get("chats-bob").await.unwrap().as_deref(),
            Some(r#"["b"]"#)
        );
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).await.unwrap();
            store.put("session-user", r#"{"id":"u1"}"#).await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::open(path).await.unwrap();
        assert!(store.get("session-user").await.unwrap().is_some());
    }
}
