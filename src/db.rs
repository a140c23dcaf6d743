//! SQLite pool for the lesson store.
//!
//! Records are written with compare-and-swap, so several writers can race on
//! one row. WAL lets readers run alongside a writer, and the busy timeout makes
//! a blocked writer wait for the lock. A lost swap then surfaces as a version
//! mismatch, not as `SQLITE_BUSY`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::config::Config;

const MAX_CONNECTIONS: u32 = 5;
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Open the pool for the configured database.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_at(&config.db.path).await
}

/// Open a pool on `path`, creating the file and its parent directories.
pub async fn connect_at(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(LOCK_WAIT);

    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open lesson database: {}", path.display()))
}
