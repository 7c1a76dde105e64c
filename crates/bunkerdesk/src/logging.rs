//! Diagnostics for the `bunker` binary.
//!
//! Every `bunker` command prints its result (tables, JSON, CSV exports) on
//! stdout, so `bunker contacts list --json | jq` and shell redirects must
//! never see a log line. Diagnostics therefore go to stderr only, and the
//! default level is WARN: a normal run prints nothing besides the command's
//! own output. `-v` and `-vv` raise the level for the crate's two targets
//! (`bunkerdesk` for the library, `bunker` for the binary) without turning
//! on debug output from rusqlite, tokio or figment. A `RUST_LOG` directive
//! replaces the flag-derived filter entirely.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much `bunker` reports on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// No flag: warnings such as a local time that had to be shifted.
    #[default]
    Normal,
    /// `-v`: storage writes and cascades.
    Verbose,
    /// `-vv`: everything the crate emits.
    Trace,
}

impl Verbosity {
    /// Map the global `--quiet` / `--verbose` flags onto a verbosity.
    ///
    /// `--quiet` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    ///
    /// Only the crate's own targets are listed, so dependencies stay at the
    /// subscriber's default of ERROR.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level();
        format!("bunkerdesk={level},bunker={level}")
    }
}

/// Install the stderr subscriber for a `bunker` run.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
///
/// ```no_run
/// use bunkerdesk::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(false, 9), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
    }

    #[test]
    fn test_default_run_only_warns() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
        assert_eq!(Verbosity::default().level(), Level::WARN);
        assert_eq!(Verbosity::Quiet.level(), Level::ERROR);
        assert_eq!(Verbosity::Trace.level(), Level::TRACE);
    }

    #[test]
    fn test_directives_name_only_crate_targets() {
        assert_eq!(
            Verbosity::Normal.directives(),
            "bunkerdesk=WARN,bunker=WARN"
        );
        let verbose = Verbosity::Verbose.directives();
        assert_eq!(verbose, "bunkerdesk=DEBUG,bunker=DEBUG");
        assert!(!verbose.contains("rusqlite"));
        assert!(EnvFilter::try_new(&verbose).is_ok());
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
