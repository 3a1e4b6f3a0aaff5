// SPDX-FileCopyrightText: 2026 Kestrel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use kestrel_config::model::StorageConfig;
use kestrel_core::KestrelError;
use tracing::{debug, info};

/// Handle to the single-writer SQLite database.
///
/// Wraps one `tokio_rusqlite::Connection`; query modules accept `&Database`
/// and run closures through [`Database::connection`]. Migrations are applied
/// on open, before the async connection is handed out.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled.
    pub async fn open(path: &str) -> Result<Self, KestrelError> {
        Self::open_with_wal(path, true).await
    }

    /// Open the database described by the storage config section.
    pub async fn open_from_config(config: &StorageConfig) -> Result<Self, KestrelError> {
        Self::open_with_wal(&config.database_path, config.wal_mode).await
    }

    /// Open (or create) the database at `path`, choosing the journal mode.
    pub async fn open_with_wal(path: &str, wal_mode: bool) -> Result<Self, KestrelError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| KestrelError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived blocking connection so the async
        // connection only ever sees a fully migrated schema.
        let migration_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), KestrelError> {
            let mut conn =
                rusqlite::Connection::open(&migration_path).map_err(|e| KestrelError::Storage {
                    source: Box::new(e),
                })?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| KestrelError::Storage {
                        source: Box::new(e),
                    })?;
            }
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| KestrelError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path.to_string())
            .await
            .map_err(|e| KestrelError::Storage {
                source: Box::new(e),
            })?;

        // Per-connection PRAGMAs (journal_mode persists in the file header).
        conn.call(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = path, wal = wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing pending writes.
    pub async fn close(self) -> Result<(), KestrelError> {
        debug!("closing database");
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KestrelError {
    KestrelError::Storage {
        source: Box::new(e),
    }
}
