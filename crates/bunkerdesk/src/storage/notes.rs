//! Saved notes and the shares granted on them.
//!
//! Access rules live in [`crate::sharing`]; this module only stores rows.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_ts, get_enum, get_ts};
use super::Storage;
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::{NoteShare, SavedNote, SharePermission};

const NOTE_COLUMNS: &str =
    "n.id, n.owner, n.title, n.content, n.contact_id, n.content_hash, n.created_at, n.updated_at";
const SHARE_COLUMNS: &str = "id, note_id, shared_with, permission, created_at";

impl Storage {
    /// Save a note, skipping it if the owner already has one with the same
    /// title and content.
    ///
    /// Returns `None` for a duplicate.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid note, or a database error.
    pub fn insert_note(&self, note: &SavedNote) -> Result<Option<i64>> {
        note.validate()?;
        let hash = SavedNote::compute_hash(&note.title, &note.content);
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM saved_notes WHERE owner = ?1 AND content_hash = ?2)",
            params![note.owner, hash],
            |row| row.get(0),
        )?;
        if exists {
            debug!("Skipping duplicate note '{}' for {}", note.title, note.owner);
            return Ok(None);
        }

        self.conn.execute(
            r"
            INSERT INTO saved_notes (owner, title, content, contact_id, content_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                note.owner,
                note.title,
                note.content,
                note.contact_id,
                hash,
                encode_ts(&note.created_at),
                encode_ts(&note.updated_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Saved note {} for {}", id, note.owner);
        self.publish(Table::SavedNotes, ChangeOp::Insert, id);
        Ok(Some(id))
    }

    /// Get a note by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_note(&self, id: i64) -> Result<Option<SavedNote>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM saved_notes n WHERE n.id = ?1");
        Ok(self.conn.query_row(&sql, [id], row_to_note).optional()?)
    }

    /// Replace a note's title and content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown note, a validation error for
    /// an empty title, or a database error.
    pub fn update_note_text(&self, id: i64, title: &str, content: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::validation("note title must not be empty"));
        }
        let affected = self.conn.execute(
            "UPDATE saved_notes SET title = ?2, content = ?3, content_hash = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                id,
                title,
                content,
                SavedNote::compute_hash(title, content),
                encode_ts(&Utc::now()),
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found("note", id));
        }
        self.publish(Table::SavedNotes, ChangeOp::Update, id);
        Ok(())
    }

    /// Delete a note and its shares.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM saved_notes WHERE id = ?1", [id])?;
        if affected > 0 {
            debug!("Deleted note {}", id);
            self.publish(Table::SavedNotes, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Notes owned by `owner`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn notes_owned_by(&self, owner: &str) -> Result<Vec<SavedNote>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM saved_notes n WHERE n.owner = ?1 ORDER BY n.updated_at DESC, n.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map([owner], row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Notes other users have shared with `user`, with the granted permission.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn notes_shared_with(&self, user: &str) -> Result<Vec<(SavedNote, SharePermission)>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}, s.permission FROM saved_notes n
             JOIN note_shares s ON s.note_id = n.id
             WHERE s.shared_with = ?1 ORDER BY n.updated_at DESC, n.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map([user], |row| Ok((row_to_note(row)?, get_enum(row, 8)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Grant or change a share and return its id.
    ///
    /// # Errors
    ///
    /// Returns a database error, including for an unknown note.
    pub fn upsert_share(&self, note_id: i64, user: &str, permission: SharePermission) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            r"
            INSERT INTO note_shares (note_id, shared_with, permission, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (note_id, shared_with) DO UPDATE SET permission = excluded.permission
            RETURNING id
            ",
            params![note_id, user, permission.as_str(), encode_ts(&Utc::now())],
            |row| row.get(0),
        )?;
        debug!("Note {} shared with {} ({})", note_id, user, permission);
        self.publish(Table::NoteShares, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Revoke a share. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_share(&self, note_id: i64, user: &str) -> Result<bool> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "DELETE FROM note_shares WHERE note_id = ?1 AND shared_with = ?2 RETURNING id",
                params![note_id, user],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = id {
            self.publish(Table::NoteShares, ChangeOp::Delete, id);
        }
        Ok(id.is_some())
    }

    /// All shares of a note, by user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn shares_for_note(&self, note_id: i64) -> Result<Vec<NoteShare>> {
        let sql = format!("SELECT {SHARE_COLUMNS} FROM note_shares WHERE note_id = ?1 ORDER BY shared_with");
        let mut stmt = self.conn.prepare(&sql)?;
        let shares = stmt
            .query_map([note_id], row_to_share)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(shares)
    }

    /// The share of `note_id` granted to `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn share_for(&self, note_id: i64, user: &str) -> Result<Option<NoteShare>> {
        let sql = format!("SELECT {SHARE_COLUMNS} FROM note_shares WHERE note_id = ?1 AND shared_with = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![note_id, user], row_to_share)
            .optional()?)
    }
}

fn row_to_note(row: &Row) -> rusqlite::Result<SavedNote> {
    Ok(SavedNote {
        id: Some(row.get(0)?),
        owner: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        contact_id: row.get(4)?,
        content_hash: row.get(5)?,
        created_at: get_ts(row, 6)?,
        updated_at: get_ts(row, 7)?,
    })
}

fn row_to_share(row: &Row) -> rusqlite::Result<NoteShare> {
    Ok(NoteShare {
        id: Some(row.get(0)?),
        note_id: row.get(1)?,
        shared_with: row.get(2)?,
        permission: get_enum(row, 3)?,
        created_at: get_ts(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_insert_deduplicates_per_owner() {
        let storage = create_test_storage();
        let note = SavedNote::new("dana", "Maersk", "Prefers barge delivery");
        assert!(storage.insert_note(&note).unwrap().is_some());
        assert!(storage.insert_note(&note).unwrap().is_none());

        let other = SavedNote::new("eli", "Maersk", "Prefers barge delivery");
        assert!(storage.insert_note(&other).unwrap().is_some());
        assert_eq!(storage.notes_owned_by("dana").unwrap().len(), 1);
    }

    #[test]
    fn test_update_text_rehashes() {
        let storage = create_test_storage();
        let id = storage
            .insert_note(&SavedNote::new("dana", "Maersk", "v1"))
            .unwrap()
            .unwrap();
        storage.update_note_text(id, "Maersk", "v2").unwrap();

        let note = storage.get_note(id).unwrap().unwrap();
        assert_eq!(note.content, "v2");
        assert_eq!(note.content_hash, SavedNote::compute_hash("Maersk", "v2"));
        assert!(storage.update_note_text(999, "t", "c").unwrap_err().is_not_found());
        assert!(storage.update_note_text(id, " ", "c").unwrap_err().is_validation());
    }

    #[test]
    fn test_shares() {
        let storage = create_test_storage();
        let id = storage
            .insert_note(&SavedNote::new("dana", "Fujairah", "Avails tight"))
            .unwrap()
            .unwrap();

        storage.upsert_share(id, "eli", SharePermission::Read).unwrap();
        storage.upsert_share(id, "eli", SharePermission::Edit).unwrap();
        let shares = storage.shares_for_note(id).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].permission, SharePermission::Edit);

        let shared = storage.notes_shared_with("eli").unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].1, SharePermission::Edit);
        assert!(storage.share_for(id, "eli").unwrap().is_some());

        assert!(storage.delete_share(id, "eli").unwrap());
        assert!(!storage.delete_share(id, "eli").unwrap());
        assert!(storage.notes_shared_with("eli").unwrap().is_empty());
    }

    #[test]
    fn test_share_unknown_note_fails() {
        let storage = create_test_storage();
        assert!(storage.upsert_share(42, "eli", SharePermission::Read).is_err());
    }

    #[test]
    fn test_delete_note_cascades_shares() {
        let storage = create_test_storage();
        let id = storage
            .insert_note(&SavedNote::new("dana", "t", "c"))
            .unwrap()
            .unwrap();
        storage.upsert_share(id, "eli", SharePermission::Read).unwrap();
        assert!(storage.delete_note(id).unwrap());
        assert!(storage.share_for(id, "eli").unwrap().is_none());
    }
}
