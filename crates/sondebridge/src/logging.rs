//! Logging configuration for sondebridge.
//!
//! This module provides initialization and configuration for the tracing-based
//! logging system used throughout sondebridge.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target of the per-message log events carrying each emitted SBS line.
///
/// Filtered independently of the crate target.
pub const SBS_TARGET: &str = "sondebridge::sbs";

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above), without the SBS line echo.
    Verbose,
    /// Very verbose output (trace level), SBS lines included.
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

    /// Build the default filter directives.
    ///
    /// `echo_messages` logs every emitted SBS line regardless of verbosity.
    /// Without it the lines only show at [`Verbosity::Trace`].
    #[must_use]
    pub fn directives(&self, echo_messages: bool) -> String {
        let crate_level = self.to_level_filter();
        let sbs_level = if echo_messages || *self == Self::Trace {
            "debug"
        } else {
            "off"
        };
        format!("sondebridge={crate_level},{SBS_TARGET}={sbs_level}")
    }
}

/// Initialize the logging system.
///
/// This should be called once at application startup. The logging level can be
/// controlled via:
/// 1. The `verbosity` parameter and the `echo_messages` switch
/// 2. The `RUST_LOG` environment variable (takes precedence)
///
/// # Examples
///
/// ```no_run
/// use sondebridge::{init_logging, logging::Verbosity};
///
/// // Info-level logs plus every emitted BaseStation line
/// init_logging(Verbosity::Normal, true);
/// ```
pub fn init_logging(verbosity: Verbosity, echo_messages: bool) {
    let default_filter = verbosity.directives(echo_messages);

    // Allow RUST_LOG to override
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    // Install the subscriber (ignore error if already set)
    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
///
/// Only warnings and errors are shown to keep test output clean.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
