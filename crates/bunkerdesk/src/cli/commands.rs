//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};

use crate::chart::ChartPeriod;
use crate::config::TIME_FORMAT;
use crate::model::{CallOutcome, DealStatus, DeliveryMethod, FuelType, GoalType, StatusFlag, TaskKind};

/// Parse a wall-clock time given as `HH:MM`.
///
/// # Errors
///
/// Returns a message naming the expected format.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| format!("invalid time '{value}', expected HH:MM"))
}

/// Contact commands.
#[derive(Debug, Subcommand)]
pub enum ContactCommand {
    /// Add a contact
    Add {
        /// Contact name
        name: String,

        #[command(flatten)]
        fields: ContactFields,
    },

    /// List contacts, highest priority first
    List {
        /// Only contacts with this status flag
        #[arg(short, long)]
        status: Option<StatusFlag>,

        /// Only contacts at or above this priority
        #[arg(short = 'p', long)]
        min_priority: Option<u8>,

        /// Include dead contacts
        #[arg(short, long)]
        all: bool,

        /// Maximum number of results (0 for all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Show one contact with recent activity
    Show {
        /// Contact id
        id: i64,
    },

    /// Search name, company and email
    Search {
        /// Text to look for
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Change fields of a contact
    Update {
        /// Contact id
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ContactFields,
    },

    /// Delete a contact and its logged activity
    Delete {
        /// Contact id
        id: i64,
    },
}

/// Optional contact fields shared by `add` and `update`.
#[derive(Debug, Default, Args)]
pub struct ContactFields {
    /// Company
    #[arg(long)]
    pub company: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Role, e.g. "fuel buyer"
    #[arg(long)]
    pub role: Option<String>,

    /// Region covered
    #[arg(long)]
    pub region: Option<String>,

    /// Priority 0-5
    #[arg(long)]
    pub priority: Option<u8>,

    /// Status flags, comma separated (client,traction,jammed,dead); empty clears
    #[arg(long)]
    pub status: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

/// Supplier commands.
#[derive(Debug, Subcommand)]
pub enum SupplierCommand {
    /// Add a supplier
    Add {
        /// Supplier name
        name: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List suppliers
    List,

    /// Show a supplier and its ports
    Show {
        /// Supplier id
        id: i64,
    },

    /// Record a port the supplier serves
    AddPort {
        /// Supplier id
        supplier: i64,

        /// Port name
        port: String,

        /// Country
        #[arg(long)]
        country: Option<String>,

        /// Fuel grades available, comma separated
        #[arg(long, value_delimiter = ',')]
        fuels: Vec<FuelType>,

        /// Delivery methods, comma separated
        #[arg(long, value_delimiter = ',')]
        delivery: Vec<DeliveryMethod>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a port entry
    RemovePort {
        /// Port entry id
        id: i64,
    },

    /// Find suppliers serving a port
    Find {
        /// Port name
        port: String,

        /// Only suppliers offering this grade
        #[arg(long)]
        fuel: Option<FuelType>,
    },

    /// Delete a supplier and its ports
    Delete {
        /// Supplier id
        id: i64,
    },
}

/// Call log commands.
#[derive(Debug, Subcommand)]
pub enum CallCommand {
    /// Log a call
    Log {
        /// Contact id
        contact: i64,

        /// How the call went
        #[arg(short, long, default_value = "connected")]
        outcome: CallOutcome,

        /// Length in minutes
        #[arg(short, long, default_value = "0")]
        duration: u32,

        /// When the call happened, local time (YYYY-MM-DD HH:MM); defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List recent calls
    List {
        /// Only calls with this contact
        #[arg(long)]
        contact: Option<i64>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Delete a logged call
    Delete {
        /// Call id
        id: i64,
    },
}

/// Email log commands.
#[derive(Debug, Subcommand)]
pub enum EmailCommand {
    /// Log an email
    Log {
        /// Contact id
        contact: i64,

        /// Subject line
        subject: String,

        /// The email was received rather than sent
        #[arg(short, long)]
        received: bool,

        /// Body text
        #[arg(short, long)]
        body: Option<String>,

        /// When it was sent, local time (YYYY-MM-DD HH:MM); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// List recent emails
    List {
        /// Only emails with this contact
        #[arg(long)]
        contact: Option<i64>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Delete a logged email
    Delete {
        /// Email id
        id: i64,
    },
}

/// Fuel deal commands.
#[derive(Debug, Subcommand)]
pub enum DealCommand {
    /// Enter a quoted deal
    Add(DealArgs),

    /// List deals, newest first
    List {
        /// Only deals in this status
        #[arg(short, long)]
        status: Option<DealStatus>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one deal
    Show {
        /// Deal id
        id: i64,
    },

    /// Move a deal to a new status
    Status {
        /// Deal id
        id: i64,

        /// New status
        status: DealStatus,
    },

    /// Delete a deal
    Delete {
        /// Deal id
        id: i64,
    },
}

/// Arguments for a new deal.
#[derive(Debug, Args)]
pub struct DealArgs {
    /// Buyer contact id
    pub contact: i64,

    /// Vessel name
    #[arg(long)]
    pub vessel: String,

    /// IMO number
    #[arg(long)]
    pub imo: Option<String>,

    /// Delivery port
    #[arg(long)]
    pub port: String,

    /// Fuel grade
    #[arg(long)]
    pub fuel: FuelType,

    /// Quantity in metric tonnes
    #[arg(long)]
    pub quantity: f64,

    /// Sell price, USD per tonne
    #[arg(long)]
    pub price: f64,

    /// Buy price, USD per tonne
    #[arg(long)]
    pub buy_price: Option<f64>,

    /// Supplier id
    #[arg(long)]
    pub supplier: Option<i64>,

    /// Delivery date (YYYY-MM-DD)
    #[arg(long)]
    pub delivery: Option<NaiveDate>,
}

/// Daily goal commands.
#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    /// Set a goal for a day
    Set {
        /// What to count
        goal_type: GoalType,

        /// Target count; defaults to the configured target
        target: Option<u32>,

        /// Day (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Deadline (HH:MM); defaults to the configured deadline
        #[arg(long, value_parser = parse_clock_time)]
        deadline: Option<NaiveTime>,
    },

    /// Set every goal type to its configured target
    Defaults {
        /// Day (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show progress against a day's goals
    Progress {
        /// Day (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Remove a goal
    Clear {
        /// Goal id
        id: i64,
    },
}

/// Call schedule commands.
#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Build a schedule from the best contacts to call
    Create {
        /// Schedule title
        #[arg(short, long, default_value = "Call block")]
        title: String,

        /// Day (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// First slot time (HH:MM); defaults to the start of the working day
        #[arg(long, value_parser = parse_clock_time)]
        start: Option<NaiveTime>,

        /// Number of slots; defaults to the configured count
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Link to the day's call goal
        #[arg(long)]
        link_goal: bool,
    },

    /// Show a schedule
    Show {
        /// Schedule id
        id: i64,
    },

    /// List schedules for a day
    List {
        /// Day (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Insert a contact into a schedule
    Insert {
        /// Schedule id
        id: i64,

        /// Contact id
        contact: i64,

        /// Position to insert at; defaults to the end
        #[arg(short, long)]
        at: Option<usize>,
    },

    /// Move a slot to another position
    Move {
        /// Schedule id
        id: i64,

        /// Current position
        from: usize,

        /// New position
        to: usize,
    },

    /// Move a slot one place earlier or later
    Nudge {
        /// Schedule id
        id: i64,

        /// Slot position
        position: usize,

        /// Move later instead of earlier
        #[arg(long)]
        down: bool,
    },

    /// Remove a slot
    Remove {
        /// Schedule id
        id: i64,

        /// Slot position
        position: usize,
    },

    /// Space all slots evenly from a start time
    Retime {
        /// Schedule id
        id: i64,

        /// First slot time (HH:MM)
        #[arg(value_parser = parse_clock_time)]
        start: NaiveTime,

        /// Minutes between slots; defaults to the configured interval
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        minutes: Option<u32>,
    },

    /// Mark a slot done (and log the call)
    Done {
        /// Schedule id
        id: i64,

        /// Slot position
        position: usize,

        /// Outcome to log for the call
        #[arg(short, long, default_value = "connected")]
        outcome: CallOutcome,

        /// Mark the slot not done instead; no call is logged
        #[arg(long)]
        undo: bool,
    },

    /// Delete a schedule
    Delete {
        /// Schedule id
        id: i64,
    },
}

/// Task commands.
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// What needs doing
        title: String,

        /// Kind of task
        #[arg(short, long, default_value = "follow_up")]
        kind: TaskKind,

        /// Due time, local (YYYY-MM-DD or YYYY-MM-DD HH:MM)
        #[arg(short, long)]
        due: Option<String>,

        /// Related contact id
        #[arg(long)]
        contact: Option<i64>,

        /// Related supplier id
        #[arg(long)]
        supplier: Option<i64>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List open tasks, soonest due first
    List,

    /// Mark a task done
    Done {
        /// Task id
        id: i64,
    },

    /// Mark a task not done
    Reopen {
        /// Task id
        id: i64,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: i64,
    },
}

/// Saved note commands.
#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    /// Save a note
    Add {
        /// Title
        title: String,

        /// Text
        content: String,

        /// Related contact id
        #[arg(long)]
        contact: Option<i64>,
    },

    /// List notes you own or that are shared with you
    List,

    /// Show a note
    Show {
        /// Note id
        id: i64,
    },

    /// Replace a note's text
    Edit {
        /// Note id
        id: i64,

        /// New text
        content: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Share a note with another user
    Share {
        /// Note id
        id: i64,

        /// User to share with
        user: String,

        /// Allow the user to edit
        #[arg(short, long)]
        edit: bool,
    },

    /// Revoke a share
    Unshare {
        /// Note id
        id: i64,

        /// User to revoke
        user: String,
    },

    /// Delete a note
    Delete {
        /// Note id
        id: i64,
    },
}

/// Chart command arguments.
#[derive(Debug, Args)]
pub struct ChartCommand {
    /// Period to chart; defaults to the saved preference
    #[arg(short, long)]
    pub period: Option<ChartPeriod>,

    /// Any day inside the period (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Which breakdown to show; all when omitted
    #[arg(value_enum)]
    pub breakdown: Option<Breakdown>,

    /// Only calls and deals from the last N days (0 for all time)
    #[arg(short, long, default_value = "30")]
    pub days: u32,
}

/// Pie chart breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Breakdown {
    /// Contacts by status
    Status,
    /// Calls by outcome
    Outcomes,
    /// Tonnes by fuel grade
    Fuel,
}

/// Preferences commands.
#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show stored preferences (or the defaults from configuration)
    Show,

    /// Store preferences
    Set {
        /// Default chart period
        #[arg(long)]
        chart_period: Option<ChartPeriod>,

        /// Home timezone (IANA name)
        #[arg(long)]
        home_timezone: Option<String>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(
            parse_clock_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert!(parse_clock_time("8.30").is_err());
        assert!(parse_clock_time("25:00").is_err());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show;
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_breakdown_debug() {
        let breakdown = Breakdown::Fuel;
        assert_eq!(format!("{breakdown:?}"), "Fuel");
    }
}
