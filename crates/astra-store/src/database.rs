// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use astra_core::AstraError;
use tracing::debug;

use crate::migrations;

/// Handle to the open SQLite database.
///
/// Wraps a single `tokio_rusqlite::Connection`; all queries go through
/// [`Database::connection`] and `conn.call()`.
#[derive(Clone, Debug)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path`, apply PRAGMAs,
    /// and run pending migrations.
    pub async fn open(path: &str) -> Result<Self, AstraError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AstraError::Storage {
                        source: Box::new(e),
                    })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| AstraError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(migrations::run_migrations)
            .await
            .map_err(map_call_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests and throwaway sessions).
    pub async fn open_in_memory() -> Result<Self, AstraError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| AstraError::Storage {
                source: Box::new(e),
            })?;
        conn.call(migrations::run_migrations)
            .await
            .map_err(map_call_err)?;
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the handle.
    pub async fn close(&self) -> Result<(), AstraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error) -> AstraError {
    AstraError::Storage {
        source: Box::new(err),
    }
}

/// Unwrap a domain error that crossed the connection's background thread.
fn map_call_err(err: tokio_rusqlite::Error<AstraError>) -> AstraError {
    match err {
        tokio_rusqlite::Error::Error(e) => e,
        other => AstraError::Storage {
            source: other.to_string().into(),
        },
    }
}
