use std::error::Error;
use std::sync::{Arc, Mutex};

use scriptrun::logging::{format_cause, LogSink, Severity};

/// One message captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub severity: Severity,
    pub message: String,
    pub cause: Option<String>,
}

/// A log sink that remembers everything it is given.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<LoggedMessage>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LoggedMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn at(&self, severity: Severity) -> Vec<LoggedMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.severity == severity)
            .collect()
    }

    /// Whether any message of `severity` contains `needle` in its text or
    /// its rendered cause.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.at(severity).iter().any(|m| {
            m.message.contains(needle) || m.cause.as_deref().is_some_and(|c| c.contains(needle))
        })
    }
}

impl LogSink for RecordingSink {
    fn log(&self, severity: Severity, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.messages.lock().unwrap().push(LoggedMessage {
            severity,
            message: message.to_string(),
            cause: cause.map(format_cause),
        });
    }
}
