//! Command-line interface for bunkerdesk.
//!
//! This module provides the CLI structure and output helpers for the
//! `bunker` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_clock_time, Breakdown, CallCommand, ChartCommand, ConfigCommand, ContactCommand,
    ContactFields, DealArgs, DealCommand, EmailCommand, GoalCommand, NoteCommand, OutputFormat,
    PrefsCommand, ScheduleCommand, StatsCommand, SupplierCommand, TaskCommand,
};

/// bunker - Sales desk CRM for marine fuel traders
///
/// Track buyers and suppliers, log calls, emails and deals, pace daily goals,
/// plan call blocks and keep an eye on the clocks at the bunkering hubs.
#[derive(Debug, Parser)]
#[command(name = "bunker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for listings
    #[arg(long, global = true, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Act as this user instead of the configured one (notes and sharing)
    #[arg(long = "as", global = true, value_name = "USER")]
    pub as_user: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage buyer contacts
    #[command(subcommand)]
    Contact(ContactCommand),

    /// Manage fuel suppliers and the ports they serve
    #[command(subcommand)]
    Supplier(SupplierCommand),

    /// Log and list calls
    #[command(subcommand)]
    Call(CallCommand),

    /// Log and list emails
    #[command(subcommand)]
    Email(EmailCommand),

    /// Enter and track fuel deals
    #[command(subcommand)]
    Deal(DealCommand),

    /// Set daily goals and check progress
    #[command(subcommand)]
    Goal(GoalCommand),

    /// Plan call blocks
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Follow-up tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Saved notes and sharing
    #[command(subcommand)]
    Note(NoteCommand),

    /// Chart calls, emails and deals over time
    Chart(ChartCommand),

    /// Pie chart breakdowns
    Stats(StatsCommand),

    /// Show the world clocks
    Clock,

    /// Show due tasks and today's goals
    Digest,

    /// Show database status
    Status,

    /// View or store user preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallOutcome, FuelType};
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            format: OutputFormat::Plain,
            as_user: None,
            command: Command::Status,
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "bunker");
    }

    #[test]
    fn test_verbosity() {
        use crate::logging::Verbosity;
        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_call_log() {
        let cli = Cli::try_parse_from(["bunker", "call", "log", "7", "-o", "no-answer", "-d", "3"]).unwrap();
        match cli.command {
            Command::Call(CallCommand::Log {
                contact,
                outcome,
                duration,
                ..
            }) => {
                assert_eq!(contact, 7);
                assert_eq!(outcome, CallOutcome::NoAnswer);
                assert_eq!(duration, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_enum_value() {
        assert!(Cli::try_parse_from(["bunker", "call", "log", "7", "-o", "shouted"]).is_err());
    }

    #[test]
    fn test_parse_port_capabilities() {
        let cli = Cli::try_parse_from([
            "bunker", "supplier", "add-port", "1", "Fujairah", "--fuels", "vlsfo,mgo",
        ])
        .unwrap();
        match cli.command {
            Command::Supplier(SupplierCommand::AddPort { fuels, .. }) => {
                assert_eq!(fuels, vec![FuelType::Vlsfo, FuelType::Mgo]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_schedule_retime() {
        let cli = Cli::try_parse_from(["bunker", "schedule", "retime", "3", "14:00", "-m", "20"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Schedule(ScheduleCommand::Retime { id: 3, minutes: Some(20), .. })
        ));
    }

    #[test]
    fn test_parse_schedule_retime_rejects_zero_minutes() {
        assert!(Cli::try_parse_from(["bunker", "schedule", "retime", "3", "14:00", "-m", "0"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bunker", "task", "list", "--format", "json", "--as", "eli"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.as_user.as_deref(), Some("eli"));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["bunker", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["bunker", "-q", "digest"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Digest));
    }
}
