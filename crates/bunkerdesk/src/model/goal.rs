use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

string_enum! {
    /// What a daily goal counts.
    pub enum GoalType {
        /// Logged calls.
        Calls => "calls",
        /// Sent emails.
        Emails => "emails",
        /// Deals entered and not cancelled.
        Deals => "deals",
    }
}

/// A per-day target with a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Day the goal applies to.
    pub date: NaiveDate,
    /// What is counted.
    pub goal_type: GoalType,
    /// Count to reach.
    pub target: u32,
    /// Local time by which the target should be reached.
    pub deadline: NaiveTime,
}

impl DailyGoal {
    /// An unsaved goal.
    #[must_use]
    pub fn new(date: NaiveDate, goal_type: GoalType, target: u32, deadline: NaiveTime) -> Self {
        Self {
            id: None,
            date,
            goal_type,
            target,
            deadline,
        }
    }
}

/// One planned call in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Who to call.
    pub contact_id: i64,
    /// Zero-based order within the schedule.
    pub position: u32,
    /// Planned local time.
    pub time: NaiveTime,
    /// Whether the call was made.
    pub completed: bool,
}

impl ScheduleSlot {
    /// A pending slot.
    #[must_use]
    pub fn new(contact_id: i64, position: u32, time: NaiveTime) -> Self {
        Self {
            id: None,
            contact_id,
            position,
            time,
            completed: false,
        }
    }
}

/// An ordered block of planned calls for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSchedule {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Goal this block works towards.
    pub goal_id: Option<i64>,
    /// Day of the block.
    pub date: NaiveDate,
    /// Label shown in listings.
    pub title: String,
    /// Slots in position order.
    pub slots: Vec<ScheduleSlot>,
    /// When the schedule was created.
    pub created_at: DateTime<Utc>,
}

impl CallSchedule {
    /// An empty, unsaved schedule.
    #[must_use]
    pub fn new(date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            id: None,
            goal_id: None,
            date,
            title: title.into(),
            slots: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Number of slots marked completed.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.completed).count()
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("schedule title must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_count() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut schedule = CallSchedule::new(date, "Morning block");
        schedule.slots.push(ScheduleSlot::new(1, 0, nine));
        schedule.slots.push(ScheduleSlot::new(2, 1, nine));
        schedule.slots[1].completed = true;
        assert_eq!(schedule.completed_count(), 1);
    }

    #[test]
    fn test_schedule_validate() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(CallSchedule::new(date, "").validate().is_err());
    }
}
