//! Tracing setup for the kursadmin binary.
//!
//! Log lines go to stderr so that `--json` output on stdout stays parseable.
//! `RUST_LOG` replaces the filter derived from `-q`/`-v` entirely.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Derive verbosity from the `--quiet` flag and the `-v` count.
    ///
    /// `--quiet` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }
}

/// Filter directives for a run.
///
/// Our own crate logs at the requested level; dependencies only surface
/// warnings unless tracing everything.
fn filter_directives(verbosity: Verbosity, rust_log: Option<&str>) -> String {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        return directives.to_string();
    }
    let level = verbosity.to_level_filter();
    match verbosity {
        Verbosity::Trace => level.to_string(),
        Verbosity::Quiet => format!("kursadmin={level},error"),
        Verbosity::Normal | Verbosity::Verbose => format!("kursadmin={level},warn"),
    }
}

/// Initialize the logging system.
///
/// Call once at startup; later calls are no-ops.
///
/// # Examples
///
/// ```no_run
/// use kursadmin::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(verbosity, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| {
        EnvFilter::new(filter_directives(verbosity, None))
    });

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity != Verbosity::Normal),
    );

    // A subscriber may already be installed (tests, embedding).
    let _ = subscriber.try_init();
}
