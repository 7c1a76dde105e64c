//! `bunkerdesk` - A sales desk CRM for marine fuel traders
//!
//! This library provides the record types, `SQLite` storage and the planning
//! logic behind the `bunker` command: daily goal pacing, call schedules,
//! communications charts, world clocks and the reminder digest.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod chart;
pub mod cli;
pub mod clocks;
pub mod config;
pub mod digest;
pub mod error;
pub mod feed;
pub mod imo;
pub mod logging;
pub mod model;
pub mod progress;
pub mod schedule;
pub mod sharing;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::{ChangeEvent, ChangeFeed, ChangeOp, Table};
pub use logging::init_logging;
pub use storage::{ContactFilter, Storage, StorageStats};
