//! Storage layer for bunkerdesk.
//!
//! This module provides `SQLite`-based persistent storage for every CRM
//! table. Each table's queries live in their own submodule as an
//! `impl Storage` block; this file holds the connection and shared helpers.

mod activity;
mod contacts;
mod goals;
pub mod migrations;
mod notes;
mod preferences;
mod rows;
pub mod schema;
mod schedules;
mod suppliers;
mod tasks;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::feed::{ChangeFeed, ChangeOp, Table};

pub use contacts::ContactFilter;

/// Storage engine for CRM records.
///
/// Every mutating method validates its input, writes, and then publishes a
/// change on the attached [`ChangeFeed`], if any.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Where committed writes are announced.
    feed: Option<ChangeFeed>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn,
            feed: None,
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            feed: None,
        })
    }

    /// Attach a change feed that receives every committed write.
    #[must_use]
    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// The attached change feed.
    #[must_use]
    pub fn feed(&self) -> Option<&ChangeFeed> {
        self.feed.as_ref()
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn publish(&self, table: Table, op: ChangeOp, id: i64) {
        if let Some(feed) = &self.feed {
            feed.publish(table, op, id);
        }
    }

    fn publish_all(&self, table: Table, op: ChangeOp, ids: &[i64]) {
        for id in ids {
            self.publish(table, op, *id);
        }
    }

    fn count(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            contacts: self.count("SELECT COUNT(*) FROM contacts")?,
            suppliers: self.count("SELECT COUNT(*) FROM suppliers")?,
            calls: self.count("SELECT COUNT(*) FROM calls")?,
            emails: self.count("SELECT COUNT(*) FROM emails")?,
            fuel_deals: self.count("SELECT COUNT(*) FROM fuel_deals")?,
            open_tasks: self.count("SELECT COUNT(*) FROM tasks WHERE completed_at IS NULL")?,
            saved_notes: self.count("SELECT COUNT(*) FROM saved_notes")?,
            call_schedules: self.count("SELECT COUNT(*) FROM call_schedules")?,
            db_size_bytes,
        })
    }
}

/// Ids returned by a single-parameter query.
fn collect_ids(conn: &Connection, sql: &str, param: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([param], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Row counts and file size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Contacts stored.
    pub contacts: i64,
    /// Suppliers stored.
    pub suppliers: i64,
    /// Calls logged.
    pub calls: i64,
    /// Emails logged.
    pub emails: i64,
    /// Deals entered.
    pub fuel_deals: i64,
    /// Tasks not yet completed.
    pub open_tasks: i64,
    /// Notes saved.
    pub saved_notes: i64,
    /// Call schedules created.
    pub call_schedules: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contact;

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_stats_empty() {
        let storage = Storage::open_in_memory().unwrap();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.contacts, 0);
        assert_eq!(stats.open_tasks, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let root = temp_dir.join(format!("bunkerdesk_test_{}", std::process::id()));
        let nested_path = root.join("nested/crm.db");
        let _ = std::fs::remove_dir_all(&root);

        let storage = Storage::open(&nested_path).unwrap();
        storage.insert_contact(&Contact::new("Ingrid")).unwrap();
        assert!(nested_path.exists());
        assert_eq!(storage.path(), nested_path);
        assert!(storage.stats().unwrap().db_size_bytes > 0);

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("bunkerdesk_reopen_{}.db", std::process::id()));

        {
            let storage = Storage::open(&db_path).unwrap();
            storage.insert_contact(&Contact::new("Ravi")).unwrap();
        }
        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.stats().unwrap().contacts, 1);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_feed_attached() {
        let feed = ChangeFeed::default();
        let storage = Storage::open_in_memory().unwrap().with_feed(feed);
        assert!(storage.feed().is_some());
    }
}
