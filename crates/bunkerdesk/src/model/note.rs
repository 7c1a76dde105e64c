use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

string_enum! {
    /// What a share grants.
    pub enum SharePermission {
        /// May read the note.
        Read => "read",
        /// May read and change the note's text.
        Edit => "edit",
    }
}

/// A free-text note, optionally about a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNote {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// User who wrote the note.
    pub owner: String,
    /// Heading.
    pub title: String,
    /// Body.
    pub content: String,
    /// Related contact.
    pub contact_id: Option<i64>,
    /// BLAKE3 hash of title and content, used to skip duplicate saves.
    pub content_hash: String,
    /// When the note was created.
    pub created_at: DateTime<Utc>,
    /// When the note last changed.
    pub updated_at: DateTime<Utc>,
}

impl SavedNote {
    /// A new note; the hash is computed from title and content.
    #[must_use]
    pub fn new(owner: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let title = title.into();
        let content = content.into();
        let now = Utc::now();
        Self {
            id: None,
            owner: owner.into(),
            content_hash: Self::compute_hash(&title, &content),
            title,
            content,
            contact_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hash of a title and body.
    #[must_use]
    pub fn compute_hash(title: &str, content: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(title.as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Replace the text and refresh the hash.
    pub fn set_text(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.title = title.into();
        self.content = content.into();
        self.content_hash = Self::compute_hash(&self.title, &self.content);
        self.updated_at = Utc::now();
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty owner or title.
    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(Error::validation("note owner must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(Error::validation("note title must not be empty"));
        }
        Ok(())
    }
}

/// Grants another user access to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteShare {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Shared note.
    pub note_id: i64,
    /// User receiving access.
    pub shared_with: String,
    /// Access granted.
    pub permission: SharePermission,
    /// When access was granted.
    pub created_at: DateTime<Utc>,
}
