//! Rendering of command output.
//!
//! Listings come out as plain lines, an aligned table, or pretty JSON. Plain
//! and table rendering share the same columns.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::OutputFormat;
use crate::chart::{chart_totals, ChartBucket};
use crate::clocks::ClockReading;
use crate::error::Result;
use crate::model::{Call, CallSchedule, Contact, Email, FuelDeal, Task};
use crate::progress::GoalProgress;
use crate::sharing::VisibleNote;
use crate::stats::PieSlice;

/// Widest bar drawn by the chart renderer.
const BAR_WIDTH: u32 = 40;

/// Pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Aligned columns under a header row.
#[must_use]
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &mut dyn Iterator<Item = &str>| -> String {
        let mut out = String::new();
        for (i, cell) in cells.enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            let width = widths.get(i).copied().unwrap_or(0);
            let _ = write!(out, "{cell:<width$}");
        }
        out.trim_end().to_string()
    };

    let mut out = line(&mut headers.iter().copied());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(&mut rule.iter().map(String::as_str)));
    for row in rows {
        out.push('\n');
        out.push_str(&line(&mut row.iter().map(String::as_str)));
    }
    out
}

/// Render a listing in `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn listing<T, F>(
    format: OutputFormat,
    items: &[T],
    empty: &str,
    headers: &[&str],
    row: F,
) -> Result<String>
where
    T: Serialize,
    F: Fn(&T) -> Vec<String>,
{
    if format == OutputFormat::Json {
        return json(items);
    }
    if items.is_empty() {
        return Ok(empty.to_string());
    }
    let rows: Vec<Vec<String>> = items.iter().map(row).collect();
    Ok(match format {
        OutputFormat::Table => table(headers, &rows),
        OutputFormat::Plain | OutputFormat::Json => rows
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .filter(|cell| !cell.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn id(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn local(at: &DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Contacts listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn contacts(format: OutputFormat, list: &[Contact]) -> Result<String> {
    listing(
        format,
        list,
        "No contacts.",
        &["ID", "NAME", "COMPANY", "PRIORITY", "STATUS", "LAST CONTACT"],
        |c| {
            vec![
                id(c.id),
                c.name.clone(),
                or_dash(c.company.as_deref()),
                c.priority.to_string(),
                c.status.to_string(),
                c.last_contacted_at
                    .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d").to_string()),
            ]
        },
    )
}

/// One contact in detail.
#[must_use]
pub fn contact_detail(contact: &Contact, tz: Tz) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", contact.display_name(), id(contact.id));
    let fields = [
        ("Email", contact.email.as_deref()),
        ("Phone", contact.phone.as_deref()),
        ("Role", contact.role.as_deref()),
        ("Region", contact.region.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<14}{value}");
        }
    }
    let _ = writeln!(out, "  {:<14}{}", "Priority", contact.priority);
    let _ = writeln!(
        out,
        "  {:<14}{} ({})",
        "Status",
        contact.status.primary(),
        contact.status
    );
    let last = contact
        .last_contacted_at
        .map_or_else(|| "never".to_string(), |at| local(&at, tz));
    let _ = writeln!(out, "  {:<14}{}", "Last contact", last);
    if let Some(notes) = &contact.notes {
        let _ = writeln!(out, "  {:<14}{}", "Notes", notes);
    }
    out.trim_end().to_string()
}

/// Calls listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn calls(format: OutputFormat, list: &[Call], tz: Tz) -> Result<String> {
    listing(
        format,
        list,
        "No calls.",
        &["ID", "CONTACT", "WHEN", "MIN", "OUTCOME", "NOTES"],
        |c| {
            vec![
                id(c.id),
                c.contact_id.to_string(),
                local(&c.called_at, tz),
                c.duration_minutes.to_string(),
                c.outcome.to_string(),
                c.notes.clone().unwrap_or_default(),
            ]
        },
    )
}

/// Emails listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn emails(format: OutputFormat, list: &[Email], tz: Tz) -> Result<String> {
    listing(
        format,
        list,
        "No emails.",
        &["ID", "CONTACT", "WHEN", "DIR", "SUBJECT"],
        |e| {
            vec![
                id(e.id),
                e.contact_id.to_string(),
                local(&e.sent_at, tz),
                e.direction.to_string(),
                e.subject.clone(),
            ]
        },
    )
}

/// Deals listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn deals(format: OutputFormat, list: &[FuelDeal]) -> Result<String> {
    listing(
        format,
        list,
        "No deals.",
        &["ID", "VESSEL", "PORT", "GRADE", "MT", "USD/MT", "MARGIN", "STATUS"],
        |d| {
            vec![
                id(d.id),
                d.vessel_name.clone(),
                d.port.clone(),
                d.fuel_type.as_str().to_uppercase(),
                format!("{:.0}", d.quantity_mt),
                format!("{:.2}", d.sell_price_usd),
                d.margin().map_or_else(|| "-".to_string(), |m| format!("{m:.2}")),
                d.status.to_string(),
            ]
        },
    )
}

/// Open tasks listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn tasks(format: OutputFormat, list: &[Task], tz: Tz, now: DateTime<Utc>) -> Result<String> {
    listing(
        format,
        list,
        "No open tasks.",
        &["ID", "KIND", "DUE", "TITLE", ""],
        |t| {
            vec![
                id(t.id),
                t.kind.to_string(),
                t.due_at.map_or_else(|| "-".to_string(), |due| local(&due, tz)),
                t.title.clone(),
                if t.is_overdue(now) {
                    "OVERDUE".to_string()
                } else {
                    String::new()
                },
            ]
        },
    )
}

/// Notes listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn notes(format: OutputFormat, list: &[VisibleNote]) -> Result<String> {
    listing(
        format,
        list,
        "No notes.",
        &["ID", "TITLE", "OWNER", "ACCESS", "UPDATED"],
        |v| {
            vec![
                id(v.note.id),
                v.note.title.clone(),
                v.note.owner.clone(),
                v.access.to_string(),
                v.note.updated_at.format("%Y-%m-%d").to_string(),
            ]
        },
    )
}

/// Goal progress listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn progress(format: OutputFormat, list: &[GoalProgress]) -> Result<String> {
    listing(
        format,
        list,
        "No goals set.",
        &["GOAL", "DONE", "TARGET", "%", "EXPECTED", "LEFT", "PACE/H", "STATUS"],
        |p| {
            vec![
                p.goal_type.to_string(),
                p.achieved.to_string(),
                p.target.to_string(),
                format!("{:.0}", p.percent),
                p.expected_by_now.to_string(),
                p.time_remaining_label(),
                p.required_pace_per_hour
                    .map_or_else(|| "-".to_string(), |pace| format!("{pace:.1}")),
                p.status.to_string(),
            ]
        },
    )
}

/// A schedule with its slots; the next pending slot is marked.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn schedule(
    format: OutputFormat,
    schedule: &CallSchedule,
    names: &dyn Fn(i64) -> String,
) -> Result<String> {
    if format == OutputFormat::Json {
        return json(schedule);
    }
    let next = crate::schedule::next_pending(&schedule.slots).map(|slot| slot.position);
    let header = format!(
        "{} (#{}) {}  {}/{} done",
        schedule.title,
        id(schedule.id),
        schedule.date,
        schedule.completed_count(),
        schedule.slots.len()
    );
    let body = listing(
        format,
        &schedule.slots,
        "No slots.",
        &["", "POS", "TIME", "CONTACT", "DONE"],
        |slot| {
            vec![
                if Some(slot.position) == next { ">".to_string() } else { " ".to_string() },
                slot.position.to_string(),
                slot.time.format("%H:%M").to_string(),
                names(slot.contact_id),
                if slot.completed { "x".to_string() } else { String::new() },
            ]
        },
    )?;
    Ok(format!("{header}\n{body}"))
}

/// Chart as horizontal bars, one line per bucket.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn chart(format: OutputFormat, buckets: &[ChartBucket]) -> Result<String> {
    if format == OutputFormat::Json {
        return json(buckets);
    }
    let max = buckets.iter().map(ChartBucket::total).max().unwrap_or(0).max(1);
    let label_width = buckets.iter().map(|b| b.label.len()).max().unwrap_or(0);
    let mut out = String::new();
    for bucket in buckets {
        let width = (bucket.total() * BAR_WIDTH).div_ceil(max);
        let _ = writeln!(
            out,
            "{:<label_width$}  {:<bar$}  {} calls, {} emails, {} deals",
            bucket.label,
            "#".repeat(width as usize),
            bucket.calls,
            bucket.emails,
            bucket.deals,
            bar = BAR_WIDTH as usize,
        );
    }
    let totals = chart_totals(buckets);
    let _ = write!(
        out,
        "Total: {} calls, {} emails, {} deals",
        totals.calls, totals.emails, totals.deals
    );
    Ok(out)
}

/// Pie chart slices as a labelled percentage list.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn pie(format: OutputFormat, title: &str, slices: &[PieSlice]) -> Result<String> {
    if format == OutputFormat::Json {
        return json(slices);
    }
    let body = listing(format, slices, "  (no data)", &["LABEL", "VALUE", "%"], |s| {
        vec![s.label.clone(), format!("{:.0}", s.value), format!("{:.1}%", s.percent)]
    })?;
    Ok(format!("{title}\n{body}"))
}

/// World clocks listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn clocks(format: OutputFormat, readings: &[ClockReading]) -> Result<String> {
    listing(
        format,
        readings,
        "No clocks configured.",
        &["CLOCK", "TIME", "OFFSET", "OPEN"],
        |r| {
            vec![
                r.label.clone(),
                r.local_time.format("%a %H:%M").to_string(),
                r.offset_label(),
                if r.business_hours { "open".to_string() } else { "closed".to_string() },
            ]
        },
    )
}
