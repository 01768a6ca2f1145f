//! Centralized error reporting.
//!
//! Every failure inside the services ends at the [`ErrorReporter`]: it is logged at
//! `error` level and a [`ErrorNotice`] is handed to the response channel of the request.
//! Nothing is re-raised to the caller.
//!
//! Failures carry a stable message key (e.g. `locale.translations_not_found`) which is
//! also the key used to look up a localized text for it, and an [`ErrorKind`].

use std::fmt::{Display, Formatter};

mod notice;
mod reporter;

pub use notice::{ErrorNotice, GENERIC_ERROR_KEY, NoticeBuffer, NoticeSink};
pub use reporter::{ErrorReporter, UNHANDLED_EXCEPTION_KEY};

/// Classification of the failures handled by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session store, the log file or its directory could not be used.
    Transport,
    /// A required resource such as a translation file does not exist.
    NotFound,
    /// A resource exists but its content cannot be understood.
    MalformedData,
    /// A lookup key is unknown. Only logged as a warning, never reported.
    LookupMiss,
    /// Anything raised by surrounding code.
    Unhandled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::LookupMiss => "lookup_miss",
            ErrorKind::Unhandled => "unhandled",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error value which can be handed to [`ErrorReporter::report`].
pub trait Reportable: std::error::Error {
    /// The message key under which the failure is logged.
    fn message_key(&self) -> &'static str;

    fn kind(&self) -> ErrorKind;
}
