//! Registry database handle
//!
//! One SQLite file under the data directory holds every app's providers and
//! current pointers. Short-lived CLI invocations and a long-running
//! coordinator may open it at the same time.

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::migrations;

/// How long a writer waits for another process's switch to commit
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Owned connection to the provider registry
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the registry file, creating and migrating it as needed
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;

        // `switchyard provider list` must not block behind a coordinator
        // that is mid-switch, so readers go through the WAL.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // A lost pointer update after power loss is recovered by the next
        // switch or sync; the provider rows themselves are committed.
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Two processes switching the same app queue up instead of failing.
        conn.busy_timeout(LOCK_WAIT)?;

        Self::prepare(conn)
    }

    /// Fresh registry that lives only as long as the handle
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, DatabaseError> {
        // The current pointer references its provider row; without this a
        // pointer could name a deleted provider.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Connection for [`ProfileStore`](super::ProfileStore) and transactions
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
