//! Daily goal progress and pacing.
//!
//! Pacing assumes work is spread evenly across the window from the start of
//! the working day to the goal's deadline. All times here are local to the
//! user's home timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clocks::{local_day_bounds, local_to_utc};
use crate::config::Config;
use crate::error::Result;
use crate::model::{string_enum, DailyGoal, GoalType};
use crate::storage::Storage;

string_enum! {
    /// Where a goal stands against its pace.
    pub enum GoalStatus {
        OnTrack => "on_track",
        Behind => "behind",
        Completed => "completed",
        Missed => "missed",
    }
}

/// Progress of one goal at a moment in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    /// Goal date.
    pub date: NaiveDate,
    /// What is being counted.
    pub goal_type: GoalType,
    /// Target count.
    pub target: u32,
    /// Count achieved so far.
    pub achieved: u32,
    /// Count still needed; zero once the target is met.
    pub remaining: u32,
    /// Achievement as a percentage, capped at 100.
    pub percent: f64,
    /// Count the even pace calls for by now, rounded down.
    pub expected_by_now: u32,
    /// Whole minutes left until the deadline.
    pub minutes_remaining: i64,
    /// Current standing.
    pub status: GoalStatus,
    /// Count per hour needed to finish on time, while that is still possible.
    pub required_pace_per_hour: Option<f64>,
}

impl GoalProgress {
    /// Evaluate `goal` with `achieved` done at local time `now`.
    #[must_use]
    pub fn compute(
        goal: &DailyGoal,
        achieved: u32,
        workday_start: NaiveTime,
        now: NaiveDateTime,
    ) -> Self {
        let target = goal.target;
        let remaining = target.saturating_sub(achieved);
        let percent = if target == 0 {
            100.0
        } else {
            (f64::from(achieved) / f64::from(target) * 100.0).min(100.0)
        };

        let start = goal.date.and_time(workday_start);
        let deadline = goal.date.and_time(goal.deadline);
        let window = (deadline - start).num_seconds().max(0);
        let elapsed = (now - start).num_seconds().clamp(0, window);

        let expected_by_now = if window == 0 {
            if now >= deadline {
                target
            } else {
                0
            }
        } else {
            let expected = u64::from(target) * elapsed.unsigned_abs() / window.unsigned_abs();
            u32::try_from(expected).unwrap_or(target)
        };

        let seconds_left = (deadline - now.max(start)).num_seconds().max(0);
        let minutes_remaining = seconds_left / 60;

        let status = if achieved >= target {
            GoalStatus::Completed
        } else if now >= deadline {
            GoalStatus::Missed
        } else if achieved >= expected_by_now {
            GoalStatus::OnTrack
        } else {
            GoalStatus::Behind
        };

        let required_pace_per_hour = (remaining > 0 && seconds_left > 0)
            .then(|| f64::from(remaining) * 3600.0 / seconds_left as f64);

        Self {
            date: goal.date,
            goal_type: goal.goal_type,
            target,
            achieved,
            remaining,
            percent,
            expected_by_now,
            minutes_remaining,
            status,
            required_pace_per_hour,
        }
    }

    /// Time left rendered as `3h 05m`.
    #[must_use]
    pub fn time_remaining_label(&self) -> String {
        format!("{}h {:02}m", self.minutes_remaining / 60, self.minutes_remaining % 60)
    }
}

/// Progress of every goal set for `date`, counting stored activity.
///
/// Activity counts from the start of the local day up to `now`. For days
/// already over, counting stops at each goal's deadline.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a query fails.
pub fn progress_for_date(
    storage: &Storage,
    date: NaiveDate,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<Vec<GoalProgress>> {
    let tz = config.home_timezone()?;
    let workday_start = config.workday_start()?;
    let local_now = now.with_timezone(&tz).naive_local();
    let (day_start, day_end) = local_day_bounds(tz, date);

    let mut progress = Vec::new();
    for goal in storage.goals_for_date(date)? {
        let until = if date < local_now.date() {
            local_to_utc(tz, date.and_time(goal.deadline))
        } else {
            now.min(day_end)
        };
        let achieved = if until > day_start {
            storage.count_activity(goal.goal_type, day_start, until)?
        } else {
            0
        };
        debug!("{} {}: {}/{}", date, goal.goal_type, achieved, goal.target);
        progress.push(GoalProgress::compute(&goal, achieved, workday_start, local_now));
    }
    Ok(progress)
}
