use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_time, get_date, get_enum, get_time};
use super::Storage;
use crate::error::Result;
use crate::feed::{ChangeOp, Table};
use crate::model::DailyGoal;

const GOAL_COLUMNS: &str = "id, goal_date, goal_type, target, deadline";

impl Storage {
    /// Set the goal for a date and type, replacing any existing one.
    ///
    /// Returns the id of the stored goal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_goal(&self, goal: &DailyGoal) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            r"
            INSERT INTO daily_goals (goal_date, goal_type, target, deadline)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (goal_date, goal_type)
            DO UPDATE SET target = excluded.target, deadline = excluded.deadline
            RETURNING id
            ",
            params![
                goal.date.to_string(),
                goal.goal_type.as_str(),
                goal.target,
                encode_time(goal.deadline),
            ],
            |row| row.get(0),
        )?;
        debug!(
            "Goal {} for {}: {} {} by {}",
            id, goal.date, goal.target, goal.goal_type, goal.deadline
        );
        let op = if goal.id == Some(id) {
            ChangeOp::Update
        } else {
            ChangeOp::Insert
        };
        self.publish(Table::DailyGoals, op, id);
        Ok(id)
    }

    /// Get a goal by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_goal(&self, id: i64) -> Result<Option<DailyGoal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM daily_goals WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id], row_to_goal).optional()?)
    }

    /// All goals set for `date`, ordered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn goals_for_date(&self, date: NaiveDate) -> Result<Vec<DailyGoal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM daily_goals WHERE goal_date = ?1 ORDER BY goal_type");
        let mut stmt = self.conn.prepare(&sql)?;
        let goals = stmt
            .query_map([date.to_string()], row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Delete a goal. Schedules linked to it are kept and unlinked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_goal(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM daily_goals WHERE id = ?1", [id])?;
        if affected > 0 {
            self.publish(Table::DailyGoals, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }
}

fn row_to_goal(row: &Row) -> rusqlite::Result<DailyGoal> {
    Ok(DailyGoal {
        id: Some(row.get(0)?),
        date: get_date(row, 1)?,
        goal_type: get_enum(row, 2)?,
        target: row.get(3)?,
        deadline: get_time(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GoalType;
    use chrono::NaiveTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn five_pm() -> NaiveTime {
        NaiveTime::from_hms_opt(17, 0, 0).unwrap()
    }

    #[test]
    fn test_upsert_replaces_target() {
        let storage = Storage::open_in_memory().unwrap();
        let first = storage
            .upsert_goal(&DailyGoal::new(date(), GoalType::Calls, 40, five_pm()))
            .unwrap();
        let second = storage
            .upsert_goal(&DailyGoal::new(date(), GoalType::Calls, 55, five_pm()))
            .unwrap();
        assert_eq!(first, second);

        let goal = storage.get_goal(first).unwrap().unwrap();
        assert_eq!(goal.target, 55);
        assert_eq!(goal.deadline, five_pm());
    }

    #[test]
    fn test_goals_for_date() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .upsert_goal(&DailyGoal::new(date(), GoalType::Emails, 20, five_pm()))
            .unwrap();
        storage
            .upsert_goal(&DailyGoal::new(date(), GoalType::Calls, 40, five_pm()))
            .unwrap();
        let tomorrow = date().succ_opt().unwrap();
        storage
            .upsert_goal(&DailyGoal::new(tomorrow, GoalType::Deals, 1, five_pm()))
            .unwrap();

        let goals = storage.goals_for_date(date()).unwrap();
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].goal_type, GoalType::Calls);
    }

    #[test]
    fn test_delete_goal() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .upsert_goal(&DailyGoal::new(date(), GoalType::Deals, 1, five_pm()))
            .unwrap();
        assert!(storage.delete_goal(id).unwrap());
        assert!(!storage.delete_goal(id).unwrap());
    }
}
