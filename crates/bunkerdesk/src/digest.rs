//! Reminder digest.
//!
//! Groups open tasks by how urgent they are and lists the day's goals, for
//! printing at the start of a session or on demand.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::model::Task;
use crate::progress::{GoalProgress, GoalStatus};

/// Text of a digest with nothing in it.
pub const EMPTY_DIGEST: &str = "Nothing due.";

/// Open tasks and goals as of one moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    /// Local time the digest was composed for.
    pub generated_at: NaiveDateTime,
    /// Due before now.
    pub overdue: Vec<Task>,
    /// Due later today.
    pub due_today: Vec<Task>,
    /// Due within the lookahead window after today.
    pub upcoming: Vec<Task>,
    /// No due time set.
    pub undated: Vec<Task>,
    /// Goal progress lines.
    pub goals: Vec<GoalProgress>,
}

impl Digest {
    /// Sort `tasks` into sections as seen from `now` in `tz`.
    ///
    /// Completed tasks and tasks due after the lookahead window are left out.
    #[must_use]
    pub fn compose(
        tasks: &[Task],
        goals: &[GoalProgress],
        now: DateTime<Utc>,
        tz: Tz,
        lookahead_days: u32,
    ) -> Self {
        let local_now = now.with_timezone(&tz).naive_local();
        let today = local_now.date();
        let horizon = today + Duration::days(i64::from(lookahead_days));

        let mut digest = Self {
            generated_at: local_now,
            overdue: Vec::new(),
            due_today: Vec::new(),
            upcoming: Vec::new(),
            undated: Vec::new(),
            goals: goals.to_vec(),
        };

        for task in tasks.iter().filter(|task| !task.is_completed()) {
            let Some(due) = task.due_at else {
                digest.undated.push(task.clone());
                continue;
            };
            let due_date = due.with_timezone(&tz).date_naive();
            if due < now {
                digest.overdue.push(task.clone());
            } else if due_date == today {
                digest.due_today.push(task.clone());
            } else if due_date <= horizon {
                digest.upcoming.push(task.clone());
            }
        }

        for section in [
            &mut digest.overdue,
            &mut digest.due_today,
            &mut digest.upcoming,
        ] {
            section.sort_by_key(|task| task.due_at);
        }
        digest
    }

    /// Whether there is nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty()
            && self.due_today.is_empty()
            && self.upcoming.is_empty()
            && self.undated.is_empty()
            && self.goals.is_empty()
    }

    /// Plain-text rendering, due times shown in `tz`.
    #[must_use]
    pub fn render_text(&self, tz: Tz) -> String {
        if self.is_empty() {
            return EMPTY_DIGEST.to_string();
        }

        let mut out = format!("Digest for {}\n", self.generated_at.format("%a %-d %b %Y %H:%M"));
        let sections = [
            ("Overdue", &self.overdue),
            ("Due today", &self.due_today),
            ("Upcoming", &self.upcoming),
            ("No due date", &self.undated),
        ];
        for (heading, tasks) in sections {
            if tasks.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{heading} ({})", tasks.len());
            for task in tasks {
                let _ = write!(out, "  - [{}] {}", task.kind, task.title);
                if let Some(due) = task.due_at {
                    let local = due.with_timezone(&tz);
                    let _ = write!(out, " (due {})", local.format("%a %-d %b %H:%M"));
                }
                out.push('\n');
            }
        }

        if !self.goals.is_empty() {
            out.push_str("\nGoals\n");
            for goal in &self.goals {
                let _ = write!(
                    out,
                    "  - {}: {}/{} ({:.0}%), {}",
                    goal.goal_type,
                    goal.achieved,
                    goal.target,
                    goal.percent,
                    goal.status.as_str().replace('_', " ")
                );
                if matches!(goal.status, GoalStatus::OnTrack | GoalStatus::Behind) {
                    let _ = write!(
                        out,
                        ", {} to go, {} left",
                        goal.remaining,
                        goal.time_remaining_label()
                    );
                }
                out.push('\n');
            }
        }
        out
    }
}
