//! Log entries and their single-line file format.
//!
//! ```text
//! [2024-03-01 14:32:01] [SessionService] [start] [u-42] [info] session.start_success
//! ```

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Module name used when the context does not name one.
pub const DEFAULT_MODULE: &str = "unknown";

/// Function name used when the context does not name one.
pub const DEFAULT_FUNCTION: &str = "global";

/// User shown for entries written without a session identity.
pub const SYSTEM_USER: &str = "System";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    /// Any other level name, kept in lowercase.
    Custom(String),
}

impl Level {
    pub fn as_str(&self) -> &str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Custom(name) => name,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Level {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" | "warning" => Level::Warning,
            "error" => Level::Error,
            other => Level::Custom(other.to_owned()),
        }
    }
}

/// Caller supplied context of a log call.
///
/// `module` and `function` end up in the log line, all other fields are only attached
/// to the console tracing event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContext {
    pub module: Option<String>,
    pub function: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for the given module (component) name.
    pub fn for_module(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Attaches an additional field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// One immutable log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub module: String,
    pub function: String,
    pub user: String,
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    /// Builds an entry stamped with the current local time, applying the defaults for
    /// everything the context and the session do not provide.
    pub fn new(message: &str, level: Level, context: &LogContext, user: Option<String>) -> Self {
        Self {
            timestamp: Local::now(),
            module: context
                .module
                .clone()
                .unwrap_or_else(|| DEFAULT_MODULE.to_owned()),
            function: context
                .function
                .clone()
                .unwrap_or_else(|| DEFAULT_FUNCTION.to_owned()),
            user: user.unwrap_or_else(|| SYSTEM_USER.to_owned()),
            level,
            message: message.to_owned(),
        }
    }

    /// Renders the newline terminated line appended to the log file.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] [{}] [{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            single_line(&self.module),
            single_line(&self.function),
            single_line(&self.user),
            self.level,
            single_line(&self.message)
        )
    }
}

/// One entry is one line, embedded line breaks are flattened.
fn single_line(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains(['\n', '\r']) {
        value.replace(['\n', '\r'], " ").into()
    } else {
        value.into()
    }
}
