// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Each [`Database`] owns one tokio-rusqlite background thread, so calls on a
//! handle run one at a time. Separate handles (and separate processes) share
//! the file through SQLite locking; `busy_timeout` makes contended writers
//! wait instead of failing.

use std::path::Path;
use std::time::Duration;

use lorekeep_config::model::StorageConfig;
use lorekeep_core::LorekeepError;
use tracing::{debug, warn};

use crate::migrations::run_migrations;

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LorekeepError {
    LorekeepError::Storage {
        source: Box::new(e),
    }
}

/// Connection settings applied when a handle is opened.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
    pub encryption_key: Option<String>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for DatabaseOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            encryption_key: config.encryption_key.clone(),
        }
    }
}

/// An open, migrated SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path` with default options.
    pub async fn open(path: &str) -> Result<Self, LorekeepError> {
        Self::open_with(path, DatabaseOptions::default()).await
    }

    /// Open the database at `path`, apply pending migrations and set up the
    /// connection PRAGMAs.
    pub async fn open_with(path: &str, options: DatabaseOptions) -> Result<Self, LorekeepError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(LorekeepError::storage)?;
        }

        // Migrations run on a plain blocking connection before the async
        // handle exists, so the schema is in place for the first call.
        let migrate_path = path.to_string();
        let migrate_options = options.clone();
        tokio::task::spawn_blocking(move || migrate(&migrate_path, &migrate_options))
            .await
            .map_err(|e| LorekeepError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(LorekeepError::storage)?;

        let key = options.encryption_key.clone();
        let busy_timeout = options.busy_timeout;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if let Some(key) = &key {
                conn.pragma_update(None, "key", key)?;
            }
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal = options.wal_mode, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The async connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), LorekeepError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), LorekeepError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(LorekeepError::storage)?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

fn migrate(path: &str, options: &DatabaseOptions) -> Result<(), LorekeepError> {
    let mut conn = rusqlite::Connection::open(path).map_err(LorekeepError::storage)?;
    if let Some(key) = &options.encryption_key {
        conn.pragma_update(None, "key", key)
            .map_err(LorekeepError::storage)?;
    }
    conn.busy_timeout(options.busy_timeout)
        .map_err(LorekeepError::storage)?;
    if options.wal_mode {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(LorekeepError::storage)?;
    }

    // Two processes opening a fresh file can both see V1 as pending; the
    // loser fails on the existing tables and finds nothing left to do on
    // the second run.
    if let Err(first) = run_migrations(&mut conn) {
        warn!(error = %first, "migration failed, retrying once");
        run_migrations(&mut conn)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/deeper/test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for table in [
            "conversations",
            "jobs",
            "learnings",
            "messages",
            "sanitization_findings",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_enables_wal_and_foreign_keys() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let (journal, fk): (String, i64) = db
            .connection()
            .call(|conn| -> Result<(String, i64), rusqlite::Error> {
                let journal = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((journal, fk))
            })
            .await
            .unwrap();
        assert_eq!(journal.to_lowercase(), "wal");
        assert_eq!(fk, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_a_no_op_migration() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let path = db_path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        assert_eq!(db.path(), path);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn encrypted_database_round_trips_with_key() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("secret.db");
        let path = db_path.to_str().unwrap();
        let options = DatabaseOptions {
            encryption_key: Some("correct horse".to_string()),
            ..DatabaseOptions::default()
        };

        Database::open_with(path, options.clone())
            .await
            .unwrap()
            .close()
            .await
            .unwrap();
        let db = Database::open_with(path, options).await.unwrap();
        db.close().await.unwrap();

        let wrong = DatabaseOptions {
            encryption_key: Some("wrong".to_string()),
            ..DatabaseOptions::default()
        };
        assert!(Database::open_with(path, wrong).await.is_err());
    }
}
