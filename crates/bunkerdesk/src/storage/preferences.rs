use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::rows::encode_ts;
use super::Storage;
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::UserPreferences;

impl Storage {
    /// Stored preferences for `user`, if any were saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored JSON
    /// no longer decodes.
    pub fn get_preferences(&self, user: &str) -> Result<Option<UserPreferences>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM user_preferences WHERE user = ?1",
                [user],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    /// Save preferences, replacing any stored for the same user.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty user name, or a database error.
    pub fn put_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        if prefs.user.trim().is_empty() {
            return Err(Error::validation("preferences need a user"));
        }
        let data = serde_json::to_string(prefs)?;
        let rowid: i64 = self.conn.query_row(
            r"
            INSERT INTO user_preferences (user, data, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (user) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            RETURNING rowid
            ",
            params![prefs.user, data, encode_ts(&Utc::now())],
            |row| row.get(0),
        )?;
        debug!("Saved preferences for {}", prefs.user);
        self.publish(Table::UserPreferences, ChangeOp::Update, rowid);
        Ok(())
    }
}
