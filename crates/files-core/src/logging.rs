//! Tracing integration for structured logging.
//!
//! Provides logging setup for the server and client binaries with:
//! - Configurable verbosity levels
//! - Optional file output
//! - JSON or text format

use std::path::Path;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Crates whose events are enabled by the default filter.
const LOG_TARGETS: &[&str] = &["files_core", "files_server", "files_client"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

/// Map a `-v` count to a level name (0=info, 1=debug, 2+=trace).
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Build the default directive string, e.g. `files_core=info,files_server=info,...`.
fn default_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the filter derived from `verbosity`. Logs go to
/// stderr unless `log_file` is given, in which case they are appended to it
/// without ANSI colors.
///
/// # Example
///
/// ```ignore
/// use files_core::logging::{init_logging, LogFormat};
///
/// init_logging(0, None, LogFormat::Text).unwrap();
/// ```
pub fn init_logging(verbosity: u8, log_file: Option<&Path>, format: LogFormat) -> Result<()> {
    let level = level_for(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            (BoxMakeWriter::new(std::sync::Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_file(verbosity >= 2)
                    .with_line_number(verbosity >= 2),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };

    result.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

/// Initialize logging with defaults for testing.
///
/// Silently ignores errors (logging may already be initialized).
pub fn init_test_logging() {
    let _ = init_logging(1, None, LogFormat::Text);
}
