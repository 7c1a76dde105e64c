//! Configuration management for bunkerdesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::clocks::parse_timezone;
use crate::error::{Error, Result};
use crate::model::GoalType;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "bunkerdesk";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "crm.db";

/// Format used for wall-clock times in configuration and on the command line.
pub const TIME_FORMAT: &str = "%H:%M";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BUNKERDESK_`, sections split on `__`)
/// 2. TOML config file at `~/.config/bunkerdesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// The single user of this installation.
    pub user: UserConfig,
    /// Working day boundaries.
    pub workday: WorkdayConfig,
    /// Default daily goal targets.
    pub goals: GoalTargets,
    /// Call schedule defaults.
    pub schedule: ScheduleConfig,
    /// World clocks shown on the timezone dashboard.
    pub clocks: ClockList,
    /// Reminder digest settings.
    pub reminders: ReminderConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/bunkerdesk/crm.db`
    pub database_path: Option<PathBuf>,
}

/// Identity of the local user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Name recorded as the owner of notes and the key for preferences.
    pub name: String,
    /// IANA timezone the user works in.
    pub home_timezone: String,
}

/// Working day boundaries, as `HH:MM` local times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkdayConfig {
    /// When the working day starts; goal pacing is measured from here.
    pub start: String,
    /// Deadline given to new daily goals.
    pub deadline: String,
}

/// Default target per goal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalTargets {
    /// Calls per day.
    pub calls: u32,
    /// Emails sent per day.
    pub emails: u32,
    /// Deals per day.
    pub deals: u32,
}

/// Call schedule defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes between generated call slots.
    pub slot_minutes: u32,
    /// Number of slots generated when none is given.
    pub default_slots: usize,
}

/// A labelled world clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSpec {
    /// Display label, usually a bunkering hub.
    pub label: String,
    /// IANA timezone name.
    pub timezone: String,
}

/// Clocks shown on the timezone dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockList {
    /// Clocks in display order.
    pub entries: Vec<ClockSpec>,
}

/// Reminder digest settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// How many days ahead the digest lists upcoming tasks.
    pub lookahead_days: u32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: std::env::var("USER").unwrap_or_else(|_| "me".to_string()),
            home_timezone: "Europe/London".to_string(),
        }
    }
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            start: "08:00".to_string(),
            deadline: "17:00".to_string(),
        }
    }
}

impl Default for GoalTargets {
    fn default() -> Self {
        Self {
            calls: 40,
            emails: 20,
            deals: 1,
        }
    }
}

impl GoalTargets {
    /// Target for the given goal type.
    #[must_use]
    pub fn target(&self, goal_type: GoalType) -> u32 {
        match goal_type {
            GoalType::Calls => self.calls,
            GoalType::Emails => self.emails,
            GoalType::Deals => self.deals,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 15,
            default_slots: 12,
        }
    }
}

impl Default for ClockList {
    fn default() -> Self {
        Self {
            entries: default_clocks(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { lookahead_days: 3 }
    }
}

/// The main bunkering hubs.
fn default_clocks() -> Vec<ClockSpec> {
    [
        ("Singapore", "Asia/Singapore"),
        ("Fujairah", "Asia/Dubai"),
        ("Rotterdam", "Europe/Amsterdam"),
        ("London", "Europe/London"),
        ("Houston", "America/Chicago"),
        ("Panama", "America/Panama"),
    ]
    .into_iter()
    .map(|(label, timezone)| ClockSpec {
        label: label.to_string(),
        timezone: timezone.to_string(),
    })
    .collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("BUNKERDESK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.user.name.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "user.name must not be empty".to_string(),
            });
        }

        parse_timezone(&self.user.home_timezone).map_err(|_| Error::ConfigValidation {
            message: format!("unknown home_timezone: {}", self.user.home_timezone),
        })?;

        for clock in &self.clocks.entries {
            parse_timezone(&clock.timezone).map_err(|_| Error::ConfigValidation {
                message: format!("clock '{}' has unknown timezone {}", clock.label, clock.timezone),
            })?;
        }

        let start = self.workday_start()?;
        let deadline = self.default_deadline()?;
        if start >= deadline {
            return Err(Error::ConfigValidation {
                message: format!(
                    "workday.start ({}) must be before workday.deadline ({})",
                    self.workday.start, self.workday.deadline
                ),
            });
        }

        if self.schedule.slot_minutes == 0 {
            return Err(Error::ConfigValidation {
                message: "schedule.slot_minutes must be greater than 0".to_string(),
            });
        }

        if self.reminders.lookahead_days == 0 {
            return Err(Error::ConfigValidation {
                message: "reminders.lookahead_days must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Parsed start of the working day.
    ///
    /// # Errors
    ///
    /// Returns an error if `workday.start` is not an `HH:MM` time.
    pub fn workday_start(&self) -> Result<NaiveTime> {
        parse_config_time("workday.start", &self.workday.start)
    }

    /// Parsed default goal deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if `workday.deadline` is not an `HH:MM` time.
    pub fn default_deadline(&self) -> Result<NaiveTime> {
        parse_config_time("workday.deadline", &self.workday.deadline)
    }

    /// The user's home timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured name is not an IANA timezone.
    pub fn home_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.user.home_timezone)
    }

    /// Gap between generated call slots.
    #[must_use]
    pub fn slot_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.schedule.slot_minutes))
    }
}

fn parse_config_time(key: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| Error::ConfigValidation {
        message: format!("{key} must be an HH:MM time, got '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_targets() {
        let targets = GoalTargets::default();
        assert_eq!(targets.target(GoalType::Calls), 40);
        assert_eq!(targets.target(GoalType::Emails), 20);
        assert_eq!(targets.target(GoalType::Deals), 1);
    }

    #[test]
    fn test_default_clocks_cover_hubs() {
        let clocks = ClockList::default();
        assert!(clocks.entries.iter().any(|c| c.label == "Singapore"));
        assert!(clocks.entries.iter().any(|c| c.label == "Rotterdam"));
    }

    #[test]
    fn test_validate_unknown_home_timezone() {
        let mut config = Config::default();
        config.user.home_timezone = "Atlantis/Deep".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("home_timezone"));
    }

    #[test]
    fn test_validate_unknown_clock_timezone() {
        let mut config = Config::default();
        config.clocks.entries.push(ClockSpec {
            label: "Nowhere".to_string(),
            timezone: "Nowhere/Port".to_string(),
        });

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Nowhere"));
    }

    #[test]
    fn test_validate_start_after_deadline() {
        let mut config = Config::default();
        config.workday.start = "18:00".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("workday.start"));
    }

    #[test]
    fn test_validate_bad_time_format() {
        let mut config = Config::default();
        config.workday.deadline = "5pm".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("HH:MM"));
    }

    #[test]
    fn test_validate_zero_slot_minutes() {
        let mut config = Config::default();
        config.schedule.slot_minutes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("slot_minutes"));
    }

    #[test]
    fn test_validate_zero_lookahead() {
        let mut config = Config::default();
        config.reminders.lookahead_days = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("crm.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/crm.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/crm.sqlite")
        );
    }

    #[test]
    fn test_workday_times() {
        let config = Config::default();
        assert_eq!(
            config.workday_start().unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            config.default_deadline().unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_slot_interval() {
        let config = Config::default();
        assert_eq!(config.slot_interval(), Duration::minutes(15));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("bunkerdesk"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("bunkerdesk_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[user]\nname = \"dana\"\nhome_timezone = \"Asia/Singapore\"\n\n[goals]\ncalls = 60\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.user.name, "dana");
        assert_eq!(config.user.home_timezone, "Asia/Singapore");
        assert_eq!(config.goals.calls, 60);
        assert_eq!(config.goals.emails, 20);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"database_path": "/tmp/x.db"}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.database_path, Some(PathBuf::from("/tmp/x.db")));
    }
}
