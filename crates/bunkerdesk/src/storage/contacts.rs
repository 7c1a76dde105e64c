use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_opt_ts, encode_ts, get_opt_ts, get_ts, sql_limit};
use super::schedules::renumber_slots;
use super::{collect_ids, Storage};
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::{Contact, ContactStatus, StatusFlag};

const CONTACT_COLUMNS: &str = "id, name, company, email, phone, role, region, \
     is_client, is_traction, is_jammed, is_dead, priority, notes, \
     last_contacted_at, created_at, updated_at";

/// Filters for [`Storage::list_contacts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    /// Only contacts with this flag set.
    pub status: Option<StatusFlag>,
    /// Only contacts at or above this priority.
    pub min_priority: Option<u8>,
    /// Include contacts flagged dead.
    pub include_dead: bool,
    /// Maximum rows; 0 means unlimited.
    pub limit: usize,
}

fn status_column(flag: StatusFlag) -> &'static str {
    match flag {
        StatusFlag::Client => "is_client",
        StatusFlag::Traction => "is_traction",
        StatusFlag::Jammed => "is_jammed",
        StatusFlag::Dead => "is_dead",
    }
}

impl Storage {
    /// Insert a contact and return its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid record, or a database error.
    pub fn insert_contact(&self, contact: &Contact) -> Result<i64> {
        contact.validate()?;

        self.conn.execute(
            r"
            INSERT INTO contacts (name, company, email, phone, role, region,
                is_client, is_traction, is_jammed, is_dead, priority, notes,
                last_contacted_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ",
            params![
                contact.name.trim(),
                contact.company,
                contact.email,
                contact.phone,
                contact.role,
                contact.region,
                contact.status.client,
                contact.status.traction,
                contact.status.jammed,
                contact.status.dead,
                contact.priority,
                contact.notes,
                encode_opt_ts(contact.last_contacted_at.as_ref()),
                encode_ts(&contact.created_at),
                encode_ts(&contact.updated_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted contact {} ({})", id, contact.name);
        self.publish(Table::Contacts, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Get a contact by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], row_to_contact)
            .optional()?)
    }

    /// Get a contact by id, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn require_contact(&self, id: i64) -> Result<Contact> {
        self.get_contact(id)?
            .ok_or_else(|| Error::not_found("contact", id))
    }

    /// Overwrite a stored contact. `updated_at` is set to now.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a record without id or with invalid
    /// fields, and [`Error::NotFound`] if no row matches.
    pub fn update_contact(&self, contact: &Contact) -> Result<()> {
        let id = contact
            .id
            .ok_or_else(|| Error::validation("contact has no id"))?;
        contact.validate()?;

        let affected = self.conn.execute(
            r"
            UPDATE contacts SET name = ?2, company = ?3, email = ?4, phone = ?5,
                role = ?6, region = ?7, is_client = ?8, is_traction = ?9,
                is_jammed = ?10, is_dead = ?11, priority = ?12, notes = ?13,
                last_contacted_at = ?14, updated_at = ?15
            WHERE id = ?1
            ",
            params![
                id,
                contact.name.trim(),
                contact.company,
                contact.email,
                contact.phone,
                contact.role,
                contact.region,
                contact.status.client,
                contact.status.traction,
                contact.status.jammed,
                contact.status.dead,
                contact.priority,
                contact.notes,
                encode_opt_ts(contact.last_contacted_at.as_ref()),
                encode_ts(&Utc::now()),
            ],
        )?;

        if affected == 0 {
            return Err(Error::not_found("contact", id));
        }
        debug!("Updated contact {}", id);
        self.publish(Table::Contacts, ChangeOp::Update, id);
        Ok(())
    }

    /// Delete a contact and, by cascade, its calls, emails, deals and slots.
    ///
    /// Call blocks that lose slots are renumbered so positions stay
    /// contiguous. Tasks and notes about the contact are kept and unlinked.
    /// A change is published for every row the delete touches.
    ///
    /// Returns `true` if a contact was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_contact(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let calls = collect_ids(&tx, "SELECT id FROM calls WHERE contact_id = ?1", id)?;
        let emails = collect_ids(&tx, "SELECT id FROM emails WHERE contact_id = ?1", id)?;
        let deals = collect_ids(&tx, "SELECT id FROM fuel_deals WHERE contact_id = ?1", id)?;
        let schedules = collect_ids(
            &tx,
            "SELECT DISTINCT schedule_id FROM schedule_slots WHERE contact_id = ?1 ORDER BY schedule_id",
            id,
        )?;
        let tasks = collect_ids(&tx, "SELECT id FROM tasks WHERE contact_id = ?1", id)?;
        let notes = collect_ids(&tx, "SELECT id FROM saved_notes WHERE contact_id = ?1", id)?;

        let affected = tx.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
        if affected == 0 {
            return Ok(false);
        }
        for schedule_id in &schedules {
            renumber_slots(&tx, *schedule_id)?;
        }
        tx.commit()?;

        debug!(
            "Deleted contact {} with {} calls, {} emails, {} deals, slots in {} schedules",
            id,
            calls.len(),
            emails.len(),
            deals.len(),
            schedules.len()
        );
        self.publish(Table::Contacts, ChangeOp::Delete, id);
        self.publish_all(Table::Calls, ChangeOp::Delete, &calls);
        self.publish_all(Table::Emails, ChangeOp::Delete, &emails);
        self.publish_all(Table::FuelDeals, ChangeOp::Delete, &deals);
        self.publish_all(Table::CallSchedules, ChangeOp::Update, &schedules);
        self.publish_all(Table::Tasks, ChangeOp::Update, &tasks);
        self.publish_all(Table::SavedNotes, ChangeOp::Update, &notes);
        Ok(true)
    }

    /// List contacts, highest priority first, then by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>> {
        let mut clauses = Vec::new();
        if let Some(flag) = filter.status {
            clauses.push(format!("{} = 1", status_column(flag)));
        }
        if filter.min_priority.is_some() {
            clauses.push("priority >= ?1".to_string());
        }
        if !filter.include_dead && filter.status != Some(StatusFlag::Dead) {
            clauses.push("is_dead = 0".to_string());
        }

        let mut sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY priority DESC, name COLLATE NOCASE ASC");
        if filter.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", sql_limit(filter.limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let contacts = match filter.min_priority {
            Some(min) => stmt
                .query_map([min], row_to_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], row_to_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(contacts)
    }

    /// Case-insensitive substring search over name, company and email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_contacts(&self, query: &str, limit: usize) -> Result<Vec<Contact>> {
        let pattern = format!("%{}%", query.trim());
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE name LIKE ?1 OR company LIKE ?1 OR email LIKE ?1
             ORDER BY priority DESC, name COLLATE NOCASE ASC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let contacts = stmt
            .query_map(params![pattern, sql_limit(limit)], row_to_contact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    /// Record that the contact was reached at `at`, keeping the latest value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn touch_last_contacted(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let stamp = encode_ts(&at);
        let affected = self.conn.execute(
            r"
            UPDATE contacts SET last_contacted_at = ?2
            WHERE id = ?1 AND (last_contacted_at IS NULL OR last_contacted_at < ?2)
            ",
            params![id, stamp],
        )?;
        if affected > 0 {
            self.publish(Table::Contacts, ChangeOp::Update, id);
        }
        Ok(())
    }
}

fn row_to_contact(row: &Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        company: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: row.get(5)?,
        region: row.get(6)?,
        status: ContactStatus {
            client: row.get(7)?,
            traction: row.get(8)?,
            jammed: row.get(9)?,
            dead: row.get(10)?,
        },
        priority: row.get(11)?,
        notes: row.get(12)?,
        last_contacted_at: get_opt_ts(row, 13)?,
        created_at: get_ts(row, 14)?,
        updated_at: get_ts(row, 15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn contact(name: &str, priority: u8, flags: &[StatusFlag]) -> Contact {
        let mut contact = Contact::new(name);
        contact.priority = priority;
        contact.status = ContactStatus::from_flags(flags);
        contact
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let mut new = contact("Ingrid Holm", 4, &[StatusFlag::Client]);
        new.company = Some("Nordic Broking".to_string());
        new.email = Some("ingrid@nordicbroking.no".to_string());

        let id = storage.insert_contact(&new).unwrap();
        let stored = storage.get_contact(id).unwrap().unwrap();

        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.name, "Ingrid Holm");
        assert_eq!(stored.company.as_deref(), Some("Nordic Broking"));
        assert!(stored.status.client);
        assert_eq!(stored.priority, 4);
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let storage = create_test_storage();
        let err = storage.insert_contact(&contact("Ravi", 9, &[])).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.stats().unwrap().contacts, 0);
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        assert!(storage.get_contact(999).unwrap().is_none());
        assert!(storage.require_contact(999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update() {
        let storage = create_test_storage();
        let id = storage.insert_contact(&contact("Ravi", 1, &[])).unwrap();

        let mut stored = storage.require_contact(id).unwrap();
        stored.priority = 3;
        stored.status.set(StatusFlag::Traction, true);
        storage.update_contact(&stored).unwrap();

        let updated = storage.require_contact(id).unwrap();
        assert_eq!(updated.priority, 3);
        assert!(updated.status.traction);
    }

    #[test]
    fn test_update_missing() {
        let storage = create_test_storage();
        let mut ghost = contact("Ghost", 0, &[]);
        ghost.id = Some(77);
        assert!(storage.update_contact(&ghost).unwrap_err().is_not_found());

        ghost.id = None;
        assert!(storage.update_contact(&ghost).unwrap_err().is_validation());
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage();
        let id = storage.insert_contact(&contact("Ravi", 1, &[])).unwrap();
        assert!(storage.delete_contact(id).unwrap());
        assert!(!storage.delete_contact(id).unwrap());
    }

    #[test]
    fn test_list_orders_by_priority_and_hides_dead() {
        let storage = create_test_storage();
        storage.insert_contact(&contact("Bea", 2, &[])).unwrap();
        storage.insert_contact(&contact("Al", 5, &[])).unwrap();
        storage.insert_contact(&contact("Cy", 2, &[])).unwrap();
        storage
            .insert_contact(&contact("Dee", 5, &[StatusFlag::Dead]))
            .unwrap();

        let names: Vec<String> = storage
            .list_contacts(&ContactFilter::default())
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Al", "Bea", "Cy"]);

        let all = storage
            .list_contacts(&ContactFilter {
                include_dead: true,
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_list_filters() {
        let storage = create_test_storage();
        storage
            .insert_contact(&contact("Al", 5, &[StatusFlag::Client]))
            .unwrap();
        storage
            .insert_contact(&contact("Bea", 1, &[StatusFlag::Client]))
            .unwrap();
        storage
            .insert_contact(&contact("Cy", 4, &[StatusFlag::Jammed]))
            .unwrap();
        storage
            .insert_contact(&contact("Dee", 3, &[StatusFlag::Dead]))
            .unwrap();

        let clients = storage
            .list_contacts(&ContactFilter {
                status: Some(StatusFlag::Client),
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(clients.len(), 2);

        let important = storage
            .list_contacts(&ContactFilter {
                min_priority: Some(4),
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(important.len(), 2);

        let dead = storage
            .list_contacts(&ContactFilter {
                status: Some(StatusFlag::Dead),
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(dead.len(), 1);

        let limited = storage
            .list_contacts(&ContactFilter {
                limit: 1,
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(limited[0].name, "Al");
    }

    #[test]
    fn test_search() {
        let storage = create_test_storage();
        let mut a = contact("Ingrid Holm", 1, &[]);
        a.company = Some("Nordic Broking".to_string());
        storage.insert_contact(&a).unwrap();
        let mut b = contact("Ravi Menon", 1, &[]);
        b.email = Some("ravi@oceanic.sg".to_string());
        storage.insert_contact(&b).unwrap();

        assert_eq!(storage.search_contacts("nordic", 10).unwrap().len(), 1);
        assert_eq!(storage.search_contacts("OCEANIC", 10).unwrap().len(), 1);
        assert_eq!(storage.search_contacts("", 10).unwrap().len(), 2);
        assert!(storage.search_contacts("zzz", 10).unwrap().is_empty());
    }

    #[test]
    fn test_touch_last_contacted_keeps_latest() {
        let storage = create_test_storage();
        let id = storage.insert_contact(&contact("Ravi", 1, &[])).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();

        storage.touch_last_contacted(id, later).unwrap();
        storage.touch_last_contacted(id, earlier).unwrap();

        let stored = storage.require_contact(id).unwrap();
        assert_eq!(stored.last_contacted_at, Some(later));
    }

    #[tokio::test]
    async fn test_delete_publishes_cascaded_changes() {
        use crate::feed::ChangeFeed;
        use crate::model::{Call, CallOutcome, CallSchedule, ScheduleSlot, Task, TaskKind};
        use chrono::{NaiveDate, NaiveTime};

        let feed = ChangeFeed::new(64);
        let mut events = feed.subscribe();
        let storage = create_test_storage().with_feed(feed);

        let id = storage.insert_contact(&contact("Ana", 3, &[])).unwrap();
        let other = storage.insert_contact(&contact("Bo", 3, &[])).unwrap();
        let call_id = storage.log_call(&Call::new(id, CallOutcome::Connected)).unwrap();
        let mut task = Task::new("Chase Fujairah stem", TaskKind::FollowUp);
        task.contact_id = Some(id);
        let task_id = storage.insert_task(&task).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut schedule = CallSchedule::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), "Block");
        schedule.slots.push(ScheduleSlot::new(id, 0, nine));
        schedule.slots.push(ScheduleSlot::new(other, 1, nine));
        let schedule_id = storage.create_schedule(&schedule).unwrap();
        while events.try_recv().is_ok() {}

        assert!(storage.delete_contact(id).unwrap());

        let first = events.recv().await.unwrap();
        assert_eq!((first.table, first.op, first.id), (Table::Contacts, ChangeOp::Delete, id));
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push((event.table, event.op, event.id));
        }
        assert!(seen.contains(&(Table::Calls, ChangeOp::Delete, call_id)));
        assert!(seen.contains(&(Table::CallSchedules, ChangeOp::Update, schedule_id)));
        assert!(seen.contains(&(Table::Tasks, ChangeOp::Update, task_id)));
        assert!(!seen.iter().any(|(table, _, _)| *table == Table::Emails));
    }

    #[test]
    fn test_delete_missing_contact() {
        let storage = create_test_storage();
        assert!(!storage.delete_contact(99).unwrap());
    }
}
