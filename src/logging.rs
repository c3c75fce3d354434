// src/logging.rs

//! Logging for `scriptrun`.
//!
//! Two layers live here:
//!
//! - [`init_logging`] installs the global `tracing-subscriber` (the durable
//!   log), writing to STDERR.
//! - [`LogSink`] is what the lifecycle manager reports through. The
//!   production [`ConsoleSink`] mirrors info/warning messages to STDOUT and
//!   errors to STDERR for the person running the script, and forwards every
//!   message to `tracing`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SCRIPTRUN_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use std::error::Error as StdError;

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("SCRIPTRUN_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Severity of a message reported through a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Destination for messages produced while driving a script run.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str, cause: Option<&(dyn StdError + 'static)>);

    fn debug(&self, message: &str) {
        self.log(Severity::Debug, message, None);
    }

    fn info(&self, message: &str) {
        self.log(Severity::Info, message, None);
    }

    fn warning(&self, message: &str) {
        self.log(Severity::Warning, message, None);
    }

    fn error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        self.log(Severity::Error, message, cause);
    }
}

/// Render an error and its `source()` chain as `outer: inner: root`.
pub fn format_cause(cause: &(dyn StdError + 'static)) -> String {
    let mut out = cause.to_string();
    let mut next = cause.source();
    while let Some(err) = next {
        out.push_str(": ");
        out.push_str(&err.to_string());
        next = err.source();
    }
    out
}

/// Sink used by the binary: terminal output plus `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, severity: Severity, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        let cause = cause.map(format_cause);
        match severity {
            Severity::Debug => match cause {
                Some(c) => tracing::debug!(cause = %c, "{message}"),
                None => tracing::debug!("{message}"),
            },
            Severity::Info => {
                println!("{message}");
                match cause {
                    Some(c) => tracing::info!(cause = %c, "{message}"),
                    None => tracing::info!("{message}"),
                }
            }
            Severity::Warning => {
                println!("{message}");
                match cause {
                    Some(c) => tracing::warn!(cause = %c, "{message}"),
                    None => tracing::warn!("{message}"),
                }
            }
            Severity::Error => {
                eprintln!("{message}");
                match cause {
                    Some(c) => {
                        eprintln!("  caused by: {c}");
                        tracing::error!(cause = %c, "{message}");
                    }
                    None => tracing::error!("{message}"),
                }
            }
        }
    }
}
