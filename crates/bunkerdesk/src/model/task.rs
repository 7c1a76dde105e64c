use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

string_enum! {
    /// What kind of follow-up a task is.
    pub enum TaskKind {
        /// Phone the contact back.
        CallBack => "call_back",
        /// Reply by email.
        EmailBack => "email_back",
        /// General chase.
        FollowUp => "follow_up",
        /// Send a price.
        Quote => "quote",
        /// Anything else.
        Other => "other",
    }
}

/// A follow-up reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Short description.
    pub title: String,
    /// Kind of follow-up.
    pub kind: TaskKind,
    /// When it is due, if dated.
    pub due_at: Option<DateTime<Utc>>,
    /// Related contact.
    pub contact_id: Option<i64>,
    /// Related supplier.
    pub supplier_id: Option<i64>,
    /// Set when done.
    pub completed_at: Option<DateTime<Utc>>,
    /// Free text.
    pub notes: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// An open, undated task.
    #[must_use]
    pub fn new(title: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: None,
            title: title.into(),
            kind,
            due_at: None,
            contact_id: None,
            supplier_id: None,
            completed_at: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the task is done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whether the task is open and past due at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_at.is_some_and(|due| due < now)
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("task title must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        let mut task = Task::new("Call back Maersk", TaskKind::CallBack);
        assert!(!task.is_overdue(now));

        task.due_at = Some(now - Duration::hours(1));
        assert!(task.is_overdue(now));

        task.completed_at = Some(now);
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_validate() {
        assert!(Task::new("", TaskKind::Other).validate().is_err());
        assert!(Task::new("Send quote", TaskKind::Quote).validate().is_ok());
    }
}
