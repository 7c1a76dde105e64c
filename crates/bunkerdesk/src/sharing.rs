//! Who may see and change a saved note.
//!
//! The owner has full control. Other users see a note only through a share,
//! and may edit it only when the share grants edit permission.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{SavedNote, SharePermission};
use crate::storage::Storage;

/// How a user reaches a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// The user owns the note.
    Owner,
    /// The note was shared with the user.
    Shared(SharePermission),
}

impl Access {
    /// Whether this access allows changing the note text.
    #[must_use]
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Owner | Self::Shared(SharePermission::Edit))
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => f.write_str("owner"),
            Self::Shared(permission) => write!(f, "shared ({permission})"),
        }
    }
}

/// A note together with how the viewer reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleNote {
    /// The note.
    pub note: SavedNote,
    /// The viewer's access.
    pub access: Access,
}

fn require_note(storage: &Storage, note_id: i64) -> Result<SavedNote> {
    storage
        .get_note(note_id)?
        .ok_or_else(|| Error::not_found("note", note_id))
}

fn require_owner(note: &SavedNote, actor: &str, action: &str) -> Result<()> {
    if note.owner != actor {
        return Err(Error::permission_denied(format!(
            "only the owner may {action} note {}",
            note.id.unwrap_or_default()
        )));
    }
    Ok(())
}

/// How `user` reaches `note_id`, if at all.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for an unknown note, or a database error.
pub fn access_for(storage: &Storage, note_id: i64, user: &str) -> Result<Option<Access>> {
    let note = require_note(storage, note_id)?;
    if note.owner == user {
        return Ok(Some(Access::Owner));
    }
    Ok(storage
        .share_for(note_id, user)?
        .map(|share| Access::Shared(share.permission)))
}

/// Share a note. Sharing again with the same user changes the permission.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] unless `actor` owns the note, a
/// validation error when sharing with oneself or an empty name, or
/// [`Error::NotFound`] for an unknown note.
pub fn share_note(
    storage: &Storage,
    note_id: i64,
    actor: &str,
    with: &str,
    permission: SharePermission,
) -> Result<i64> {
    let note = require_note(storage, note_id)?;
    require_owner(&note, actor, "share")?;
    let with = with.trim();
    if with.is_empty() {
        return Err(Error::validation("share needs a user name"));
    }
    if with == note.owner {
        return Err(Error::validation("cannot share a note with its owner"));
    }
    let id = storage.upsert_share(note_id, with, permission)?;
    info!("Note {} shared with {} ({})", note_id, with, permission);
    Ok(id)
}

/// Revoke a share. Returns whether one existed.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] unless `actor` owns the note, or
/// [`Error::NotFound`] for an unknown note.
pub fn unshare_note(storage: &Storage, note_id: i64, actor: &str, with: &str) -> Result<bool> {
    let note = require_note(storage, note_id)?;
    require_owner(&note, actor, "unshare")?;
    storage.delete_share(note_id, with.trim())
}

/// Notes `user` owns followed by notes shared with them.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn visible_notes(storage: &Storage, user: &str) -> Result<Vec<VisibleNote>> {
    let mut notes: Vec<VisibleNote> = storage
        .notes_owned_by(user)?
        .into_iter()
        .map(|note| VisibleNote {
            note,
            access: Access::Owner,
        })
        .collect();
    notes.extend(
        storage
            .notes_shared_with(user)?
            .into_iter()
            .map(|(note, permission)| VisibleNote {
                note,
                access: Access::Shared(permission),
            }),
    );
    Ok(notes)
}

/// Read a note `user` can see.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] if the note is neither owned by nor
/// shared with `user`, or [`Error::NotFound`] for an unknown note.
pub fn read_note(storage: &Storage, note_id: i64, user: &str) -> Result<VisibleNote> {
    let access = access_for(storage, note_id, user)?.ok_or_else(|| {
        Error::permission_denied(format!("note {note_id} is not shared with {user}"))
    })?;
    let note = require_note(storage, note_id)?;
    Ok(VisibleNote { note, access })
}

/// Change a note's text as `actor`.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] unless `actor` owns the note or holds
/// an edit share, or [`Error::NotFound`] for an unknown note.
pub fn edit_note(
    storage: &Storage,
    note_id: i64,
    actor: &str,
    title: Option<&str>,
    content: &str,
) -> Result<()> {
    let access = access_for(storage, note_id, actor)?;
    if !access.is_some_and(Access::can_edit) {
        return Err(Error::permission_denied(format!(
            "{actor} may not edit note {note_id}"
        )));
    }
    let note = require_note(storage, note_id)?;
    storage.update_note_text(note_id, title.unwrap_or(&note.title), content)
}

/// Delete a note and every share of it.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] unless `actor` owns the note, or
/// [`Error::NotFound`] for an unknown note.
pub fn delete_note(storage: &Storage, note_id: i64, actor: &str) -> Result<()> {
    let note = require_note(storage, note_id)?;
    require_owner(&note, actor, "delete")?;
    storage.delete_note(note_id)?;
    info!("Deleted note {}", note_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Storage, i64) {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .insert_note(&SavedNote::new("dana", "Fujairah avails", "Tight until Friday"))
            .unwrap()
            .unwrap();
        (storage, id)
    }

    #[test]
    fn test_only_owner_shares() {
        let (storage, id) = setup();
        let err = share_note(&storage, id, "eli", "fay", SharePermission::Read).unwrap_err();
        assert!(err.is_permission_error());
        share_note(&storage, id, "dana", "eli", SharePermission::Read).unwrap();
        assert_eq!(
            access_for(&storage, id, "eli").unwrap(),
            Some(Access::Shared(SharePermission::Read))
        );
    }

    #[test]
    fn test_self_share_rejected() {
        let (storage, id) = setup();
        let err = share_note(&storage, id, "dana", "dana", SharePermission::Edit).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_reshare_updates_permission() {
        let (storage, id) = setup();
        share_note(&storage, id, "dana", "eli", SharePermission::Read).unwrap();
        share_note(&storage, id, "dana", "eli", SharePermission::Edit).unwrap();
        assert_eq!(storage.shares_for_note(id).unwrap().len(), 1);
        assert!(access_for(&storage, id, "eli").unwrap().unwrap().can_edit());
    }

    #[test]
    fn test_visible_notes() {
        let (storage, id) = setup();
        storage
            .insert_note(&SavedNote::new("eli", "Own note", "x"))
            .unwrap();
        share_note(&storage, id, "dana", "eli", SharePermission::Read).unwrap();

        let notes = visible_notes(&storage, "eli").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].access, Access::Owner);
        assert_eq!(notes[1].access, Access::Shared(SharePermission::Read));
        assert!(visible_notes(&storage, "fay").unwrap().is_empty());
    }

    #[test]
    fn test_edit_rules() {
        let (storage, id) = setup();
        share_note(&storage, id, "dana", "eli", SharePermission::Read).unwrap();
        assert!(edit_note(&storage, id, "eli", None, "x").unwrap_err().is_permission_error());
        assert!(edit_note(&storage, id, "fay", None, "x").unwrap_err().is_permission_error());

        share_note(&storage, id, "dana", "eli", SharePermission::Edit).unwrap();
        edit_note(&storage, id, "eli", None, "Open from Monday").unwrap();
        let note = read_note(&storage, id, "dana").unwrap().note;
        assert_eq!(note.content, "Open from Monday");
        assert_eq!(note.title, "Fujairah avails");
    }

    #[test]
    fn test_read_requires_access() {
        let (storage, id) = setup();
        assert!(read_note(&storage, id, "fay").unwrap_err().is_permission_error());
        assert!(read_note(&storage, 999, "dana").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_owner_only_and_cascades() {
        let (storage, id) = setup();
        share_note(&storage, id, "dana", "eli", SharePermission::Edit).unwrap();
        assert!(delete_note(&storage, id, "eli").unwrap_err().is_permission_error());

        delete_note(&storage, id, "dana").unwrap();
        assert!(storage.notes_shared_with("eli").unwrap().is_empty());
        assert!(access_for(&storage, id, "eli").unwrap_err().is_not_found());
    }

    #[test]
    fn test_unshare() {
        let (storage, id) = setup();
        share_note(&storage, id, "dana", "eli", SharePermission::Read).unwrap();
        assert!(unshare_note(&storage, id, "eli", "eli").unwrap_err().is_permission_error());
        assert!(unshare_note(&storage, id, "dana", "eli").unwrap());
        assert_eq!(access_for(&storage, id, "eli").unwrap(), None);
    }
}
