//! Call schedules and their ordered slots.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_time, encode_ts, get_date, get_time, get_ts};
use super::{collect_ids, Storage};
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::{CallSchedule, ScheduleSlot};

const SCHEDULE_COLUMNS: &str = "id, goal_id, schedule_date, title, created_at";
const SLOT_COLUMNS: &str = "id, contact_id, position, slot_time, completed";

impl Storage {
    /// Store a schedule with its slots and return the schedule id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title, or a database error
    /// (including a slot naming an unknown contact).
    pub fn create_schedule(&self, schedule: &CallSchedule) -> Result<i64> {
        schedule.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO call_schedules (goal_id, schedule_date, title, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                schedule.goal_id,
                schedule.date.to_string(),
                schedule.title.trim(),
                encode_ts(&schedule.created_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        insert_slots(&tx, id, &schedule.slots)?;
        tx.commit()?;

        debug!(
            "Created schedule {} '{}' with {} slots",
            id,
            schedule.title,
            schedule.slots.len()
        );
        self.publish(Table::CallSchedules, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Get a schedule with its slots in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_schedule(&self, id: i64) -> Result<Option<CallSchedule>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM call_schedules WHERE id = ?1");
        let Some(mut schedule) = self
            .conn
            .query_row(&sql, [id], row_to_schedule)
            .optional()?
        else {
            return Ok(None);
        };
        schedule.slots = self.load_slots(id)?;
        Ok(Some(schedule))
    }

    /// Schedules for `date`, oldest first, with their slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schedules_for_date(&self, date: NaiveDate) -> Result<Vec<CallSchedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM call_schedules WHERE schedule_date = ?1 ORDER BY created_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut schedules = stmt
            .query_map([date.to_string()], row_to_schedule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for schedule in &mut schedules {
            if let Some(id) = schedule.id {
                schedule.slots = self.load_slots(id)?;
            }
        }
        Ok(schedules)
    }

    /// Replace the slots of a schedule in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown schedule, or a database error.
    pub fn save_slots(&self, schedule_id: i64, slots: &[ScheduleSlot]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM call_schedules WHERE id = ?1)",
            [schedule_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::not_found("schedule", schedule_id));
        }
        tx.execute("DELETE FROM schedule_slots WHERE schedule_id = ?1", [schedule_id])?;
        insert_slots(&tx, schedule_id, slots)?;
        tx.commit()?;

        debug!("Saved {} slots for schedule {}", slots.len(), schedule_id);
        self.publish(Table::CallSchedules, ChangeOp::Update, schedule_id);
        Ok(())
    }

    /// Mark the slot at `position` done or not done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the schedule has no such slot, or a
    /// database error.
    pub fn set_slot_completed(&self, schedule_id: i64, position: u32, completed: bool) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE schedule_slots SET completed = ?3 WHERE schedule_id = ?1 AND position = ?2",
            params![schedule_id, position, completed],
        )?;
        if affected == 0 {
            return Err(Error::not_found("schedule slot", i64::from(position)));
        }
        self.publish(Table::CallSchedules, ChangeOp::Update, schedule_id);
        Ok(())
    }

    /// Delete a schedule and its slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_schedule(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM call_schedules WHERE id = ?1", [id])?;
        if affected > 0 {
            debug!("Deleted schedule {}", id);
            self.publish(Table::CallSchedules, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    fn load_slots(&self, schedule_id: i64) -> Result<Vec<ScheduleSlot>> {
        let sql = format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE schedule_id = ?1 ORDER BY position"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let slots = stmt
            .query_map([schedule_id], row_to_slot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(slots)
    }
}

/// Rewrite a schedule's slot positions as `0..n` in their current order.
pub(super) fn renumber_slots(conn: &Connection, schedule_id: i64) -> Result<()> {
    let slot_ids = collect_ids(
        conn,
        "SELECT id FROM schedule_slots WHERE schedule_id = ?1 ORDER BY position",
        schedule_id,
    )?;
    let mut stmt = conn.prepare("UPDATE schedule_slots SET position = ?2 WHERE id = ?1")?;
    for (position, slot_id) in slot_ids.iter().enumerate() {
        stmt.execute(params![slot_id, position as u32])?;
    }
    Ok(())
}

fn insert_slots(conn: &Connection, schedule_id: i64, slots: &[ScheduleSlot]) -> Result<()> {
    let mut stmt = conn.prepare(
        r"
        INSERT INTO schedule_slots (schedule_id, contact_id, position, slot_time, completed)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
    )?;
    for slot in slots {
        stmt.execute(params![
            schedule_id,
            slot.contact_id,
            slot.position,
            encode_time(slot.time),
            slot.completed,
        ])?;
    }
    Ok(())
}

fn row_to_schedule(row: &Row) -> rusqlite::Result<CallSchedule> {
    Ok(CallSchedule {
        id: Some(row.get(0)?),
        goal_id: row.get(1)?,
        date: get_date(row, 2)?,
        title: row.get(3)?,
        slots: Vec::new(),
        created_at: get_ts(row, 4)?,
    })
}

fn row_to_slot(row: &Row) -> rusqlite::Result<ScheduleSlot> {
    Ok(ScheduleSlot {
        id: Some(row.get(0)?),
        contact_id: row.get(1)?,
        position: row.get(2)?,
        time: get_time(row, 3)?,
        completed: row.get(4)?,
    })
}
