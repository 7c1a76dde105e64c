use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_opt_ts, encode_ts, get_enum, get_opt_ts, get_ts};
use super::Storage;
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::Task;

const TASK_COLUMNS: &str =
    "id, title, kind, due_at, contact_id, supplier_id, completed_at, notes, created_at";

impl Storage {
    /// Insert a task and return its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title, or a database error.
    pub fn insert_task(&self, task: &Task) -> Result<i64> {
        task.validate()?;
        self.conn.execute(
            r"
            INSERT INTO tasks (title, kind, due_at, contact_id, supplier_id, completed_at, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                task.title.trim(),
                task.kind.as_str(),
                encode_opt_ts(task.due_at.as_ref()),
                task.contact_id,
                task.supplier_id,
                encode_opt_ts(task.completed_at.as_ref()),
                task.notes,
                encode_ts(&task.created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted {} task {}", task.kind, id);
        self.publish(Table::Tasks, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Get a task by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id], row_to_task).optional()?)
    }

    /// Mark a task done at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task, or a database error.
    pub fn complete_task(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        self.set_task_completion(id, Some(at))
    }

    /// Clear a task's completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown task, or a database error.
    pub fn reopen_task(&self, id: i64) -> Result<()> {
        self.set_task_completion(id, None)
    }

    fn set_task_completion(&self, id: i64, at: Option<DateTime<Utc>>) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE tasks SET completed_at = ?2 WHERE id = ?1",
            params![id, encode_opt_ts(at.as_ref())],
        )?;
        if affected == 0 {
            return Err(Error::not_found("task", id));
        }
        self.publish(Table::Tasks, ChangeOp::Update, id);
        Ok(())
    }

    /// Delete a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected > 0 {
            self.publish(Table::Tasks, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Open tasks, soonest due first, undated last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn open_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE completed_at IS NULL
             ORDER BY due_at IS NULL, due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Open tasks due strictly before `until`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn tasks_due_before(&self, until: DateTime<Utc>) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE completed_at IS NULL AND due_at IS NOT NULL AND due_at < ?1
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([encode_ts(&until)], row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        kind: get_enum(row, 2)?,
        due_at: get_opt_ts(row, 3)?,
        contact_id: row.get(4)?,
        supplier_id: row.get(5)?,
        completed_at: get_opt_ts(row, 6)?,
        notes: row.get(7)?,
        created_at: get_ts(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contact, TaskKind};
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn task_due(title: &str, due: Option<DateTime<Utc>>) -> Task {
        let mut task = Task::new(title, TaskKind::FollowUp);
        task.due_at = due;
        task
    }

    #[test]
    fn test_open_tasks_order() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert_task(&task_due("undated", None)).unwrap();
        storage
            .insert_task(&task_due("later", Some(noon() + Duration::hours(2))))
            .unwrap();
        storage
            .insert_task(&task_due("sooner", Some(noon() - Duration::hours(2))))
            .unwrap();

        let titles: Vec<String> = storage
            .open_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["sooner", "later", "undated"]);
    }

    #[test]
    fn test_complete_and_reopen() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage.insert_task(&task_due("quote", Some(noon()))).unwrap();

        storage.complete_task(id, noon()).unwrap();
        assert!(storage.get_task(id).unwrap().unwrap().is_completed());
        assert!(storage.open_tasks().unwrap().is_empty());

        storage.reopen_task(id).unwrap();
        assert_eq!(storage.open_tasks().unwrap().len(), 1);
        assert!(storage.complete_task(999, noon()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_tasks_due_before() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_task(&task_due("overdue", Some(noon() - Duration::days(1))))
            .unwrap();
        storage
            .insert_task(&task_due("future", Some(noon() + Duration::days(1))))
            .unwrap();
        storage.insert_task(&task_due("undated", None)).unwrap();

        let due = storage.tasks_due_before(noon()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "overdue");
    }

    #[test]
    fn test_contact_delete_unlinks_task() {
        let storage = Storage::open_in_memory().unwrap();
        let contact = storage.insert_contact(&Contact::new("Ana")).unwrap();
        let mut task = task_due("call back", None);
        task.contact_id = Some(contact);
        let id = storage.insert_task(&task).unwrap();

        storage.delete_contact(contact).unwrap();
        assert_eq!(storage.get_task(id).unwrap().unwrap().contact_id, None);
        assert!(storage.delete_task(id).unwrap());
    }
}
