use crate::errors::{ErrorReporter, Reportable};
use crate::logging::entry::{Level, LogContext, LogEntry};
use crate::logging::file::{LogError, LogFile};
use crate::session::SessionService;
use std::sync::{Arc, Weak};

const MODULE: &str = "LogService";

/// Writes structured entries to the shared log file.
///
/// The user of every entry is taken from the `user_id` of the session the service
/// belongs to. Failures to write are reported to the [`ErrorReporter`] and never
/// surface to the caller other than through the `false` return value of [`Self::log`].
pub struct LogService {
    file: Arc<LogFile>,
    session: Arc<SessionService>,
    reporter: Weak<ErrorReporter>,
}

impl LogService {
    /// Creates a service writing to `file` on behalf of `session`.
    ///
    /// The reporter is held weakly as it itself logs through this service.
    pub fn new(file: Arc<LogFile>, session: Arc<SessionService>, reporter: Weak<ErrorReporter>) -> Self {
        Self {
            file,
            session,
            reporter,
        }
    }

    /// Logs a message with the default context.
    pub fn log(&self, message: &str, level: Level) -> bool {
        self.log_with(message, level, &LogContext::new())
    }

    /// Logs a message and reports a failure to write it.
    ///
    /// Returns `true` once the line has been appended to the log file.
    pub fn log_with(&self, message: &str, level: Level, context: &LogContext) -> bool {
        match self.write(message, level, context) {
            Ok(()) => true,
            Err(err) => {
                self.report_failure(&err);
                false
            }
        }
    }

    pub fn info(&self, message: &str, context: &LogContext) -> bool {
        self.log_with(message, Level::Info, context)
    }

    pub fn warning(&self, message: &str, context: &LogContext) -> bool {
        self.log_with(message, Level::Warning, context)
    }

    /// Builds and appends an entry without reporting failures.
    ///
    /// This is the path used by the reporter itself, so that a broken log file cannot
    /// cause a reporting loop.
    pub fn write(&self, message: &str, level: Level, context: &LogContext) -> Result<(), LogError> {
        let entry = LogEntry::new(message, level, context, self.session.user_id());
        trace_entry(&entry, context);
        self.file.append(&entry.to_line())
    }

    fn report_failure(&self, err: &LogError) {
        match self.reporter.upgrade() {
            Some(reporter) => reporter.report(
                err,
                LogContext::for_module(MODULE)
                    .function("log")
                    .with("path", self.file.path().display().to_string()),
            ),
            None => tracing::error!("{}: {:#}", err.message_key(), err),
        }
    }
}

/// Mirrors an entry onto the console tracing subscriber.
fn trace_entry(entry: &LogEntry, context: &LogContext) {
    let fields = (!context.fields.is_empty())
        .then(|| serde_json::to_string(&context.fields).unwrap_or_default())
        .unwrap_or_default();

    macro_rules! emit {
        ($macro:ident) => {
            tracing::$macro!(
                module = %entry.module,
                function = %entry.function,
                user = %entry.user,
                context = %fields,
                "{}",
                entry.message
            )
        };
    }

    match entry.level {
        Level::Debug => emit!(debug),
        Level::Info | Level::Custom(_) => emit!(info),
        Level::Warning => emit!(warn),
        Level::Error => emit!(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorNotice, NoticeBuffer};
    use crate::session::MemorySessionStore;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: std::path::PathBuf,
        session: Arc<SessionService>,
        notices: Arc<NoticeBuffer>,
        reporter: Arc<ErrorReporter>,
    }

    impl Fixture {
        fn new(relative_path: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(relative_path);
            let session = Arc::new(SessionService::new(
                Arc::new(MemorySessionStore::new()),
                Duration::from_secs(1800),
            ));
            let notices = Arc::new(NoticeBuffer::new());
            let file = Arc::new(LogFile::new(&path));
            let reporter = Arc::new_cyclic(|reporter| {
                let log = Arc::new(LogService::new(file, session.clone(), reporter.clone()));
                ErrorReporter::new(log, true, notices.clone())
            });

            Self {
                _dir: dir,
                path,
                session,
                notices,
                reporter,
            }
        }

        fn log(&self) -> &LogService {
            self.reporter.log_service()
        }

        fn lines(&self) -> Vec<String> {
            std::fs::read_to_string(&self.path)
                .unwrap_or_default()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    #[test]
    fn writes_context_and_session_user() {
        let fixture = Fixture::new("logs/app.log");
        fixture.session.set("user_id", "u-42");

        let context = LogContext::for_module("UserModule").function("signIn");
        assert!(fixture.log().log_with("INFO_MESSAGE", Level::Info, &context));

        let lines = fixture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] [UserModule] [signIn] [u-42] [info] INFO_MESSAGE"));
    }

    #[test]
    fn falls_back_to_system_user_and_defaults() {
        let fixture = Fixture::new("app.log");

        assert!(fixture.log().log("boot", Level::Warning));

        let lines = fixture.lines();
        assert!(lines[0].ends_with("] [unknown] [global] [System] [warning] boot"));
    }

    #[test]
    fn each_call_appends_exactly_one_line() {
        let fixture = Fixture::new("app.log");

        for index in 0..5 {
            assert!(fixture.log().log(&format!("message-{index}"), Level::Info));
        }

        let lines = fixture.lines();
        assert_eq!(lines.len(), 5);
        assert!(lines[4].ends_with("message-4"));
    }

    #[test]
    fn write_failures_return_false_and_are_reported() {
        let fixture = Fixture::new("blocker/app.log");
        std::fs::write(fixture.path.parent().unwrap(), "not a directory").unwrap();

        assert!(!fixture.log().log("lost", Level::Info));

        let notices = fixture.notices.take();
        assert_eq!(notices.len(), 1);
        assert!(matches!(
            &notices[0],
            ErrorNotice::Detailed { key, .. } if key == "logger.error_create_dir"
        ));
    }
}
