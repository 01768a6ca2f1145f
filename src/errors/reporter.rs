use crate::errors::{ErrorNotice, GENERIC_ERROR_KEY, NoticeSink, Reportable};
use crate::logging::{Level, LogContext, LogService};
use std::panic::Location;
use std::sync::Arc;

/// Message key of failures raised by surrounding code.
pub const UNHANDLED_EXCEPTION_KEY: &str = "exception.unhandled";

const MODULE: &str = "ErrorReporter";

/// Logs failures and surfaces a notice about them to the user.
///
/// Whether the notice carries the message key and its context or only a generic key is
/// controlled by `display_errors`.
pub struct ErrorReporter {
    log: Arc<LogService>,
    display_errors: bool,
    notices: Arc<dyn NoticeSink>,
}

impl ErrorReporter {
    pub fn new(log: Arc<LogService>, display_errors: bool, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            log,
            display_errors,
            notices,
        }
    }

    pub fn log_service(&self) -> &Arc<LogService> {
        &self.log
    }

    /// Logs `key` at error level and surfaces a notice for it.
    ///
    /// Never fails: if the entry cannot be written, only a console warning is emitted.
    pub fn handle_error(&self, key: &str, context: LogContext) {
        if let Err(err) = self.log.write(key, Level::Error, &context) {
            tracing::warn!(
                "Failed to log reported error '{}' ({}): {:#}",
                key,
                err.message_key(),
                err
            );
        }

        let notice = if self.display_errors {
            ErrorNotice::Detailed {
                key: key.to_owned(),
                context: context.fields,
            }
        } else {
            ErrorNotice::Generic {
                key: GENERIC_ERROR_KEY,
            }
        };

        self.notices.surface(notice);
    }

    /// Reports a typed failure under its own message key.
    pub fn report(&self, error: &dyn Reportable, context: LogContext) {
        let context = context
            .with("kind", error.kind().as_str())
            .with("error", error.to_string());

        self.handle_error(error.message_key(), context);
    }

    /// Reports a failure raised by surrounding code which has no message key of its own.
    ///
    /// The context records the error type, its message, the location of the call and the
    /// chain of causes.
    ///
    /// `exceptionClass` is the static type handed in. Errors already converted into an
    /// `anyhow::Error` are recorded as such, so `rootCause` additionally carries the
    /// `Debug` head of the innermost error, e.g. `Os` or `ParseIntError`.
    #[track_caller]
    pub fn handle_exception<E>(&self, error: E)
    where
        E: Into<anyhow::Error>,
    {
        let location = Location::caller();
        let exception_class = std::any::type_name::<E>();
        let error = error.into();

        let context = LogContext::for_module(MODULE)
            .function("handle_exception")
            .with("exceptionClass", exception_class)
            .with("message", error.to_string())
            .with("file", location.file())
            .with("line", location.line())
            .with("rootCause", debug_head(error.root_cause()))
            .with("trace", format!("{:?}", error));

        self.handle_error(UNHANDLED_EXCEPTION_KEY, context);
    }
}

/// The leading type or variant name of the `Debug` rendering of `error`.
fn debug_head(error: &(dyn std::error::Error + 'static)) -> String {
    let rendered = format!("{:?}", error);
    match rendered.find([' ', '(', '{']) {
        Some(end) if end > 0 => rendered[..end].to_owned(),
        _ => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, NoticeBuffer};
    use crate::logging::LogFile;
    use crate::session::{MemorySessionStore, SessionService};
    use serde_json::json;
    use std::time::Duration;
    use thiserror::Error;

    struct Fixture {
        dir: tempfile::TempDir,
        notices: Arc<NoticeBuffer>,
        reporter: Arc<ErrorReporter>,
    }

    impl Fixture {
        fn new(display_errors: bool) -> Self {
            Self::with_log_path(display_errors, "app.log")
        }

        fn with_log_path(display_errors: bool, relative_path: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let file = Arc::new(LogFile::new(dir.path().join(relative_path)));
            let session = Arc::new(SessionService::new(
                Arc::new(MemorySessionStore::new()),
                Duration::from_secs(60),
            ));
            let notices = Arc::new(NoticeBuffer::new());
            let reporter = Arc::new_cyclic(|reporter| {
                let log = Arc::new(LogService::new(file, session, reporter.clone()));
                ErrorReporter::new(log, display_errors, notices.clone())
            });

            Self {
                dir,
                notices,
                reporter,
            }
        }

        fn log_contents(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("app.log")).unwrap_or_default()
        }
    }

    #[derive(Debug, Error)]
    #[error("translation file is gone")]
    struct Missing;

    impl Reportable for Missing {
        fn message_key(&self) -> &'static str {
            "locale.translations_not_found"
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::NotFound
        }
    }

    #[test]
    fn detailed_notices_carry_key_and_context() {
        let fixture = Fixture::new(true);

        fixture
            .reporter
            .handle_error("payment.declined", LogContext::for_module("Checkout").with("orderId", 7));

        let notices = fixture.notices.take();
        assert_eq!(
            notices,
            vec![ErrorNotice::Detailed {
                key: "payment.declined".to_owned(),
                context: [("orderId".to_owned(), json!(7))].into_iter().collect(),
            }]
        );
        assert!(
            fixture
                .log_contents()
                .contains("[Checkout] [global] [System] [error] payment.declined")
        );
    }

    #[test]
    fn generic_notices_hide_details() {
        let fixture = Fixture::new(false);

        fixture.reporter.report(&Missing, LogContext::new());

        assert_eq!(
            fixture.notices.take(),
            vec![ErrorNotice::Generic {
                key: GENERIC_ERROR_KEY
            }]
        );
        assert!(fixture.log_contents().contains("[error] locale.translations_not_found"));
    }

    #[test]
    fn reports_attach_kind_and_message() {
        let fixture = Fixture::new(true);

        fixture.reporter.report(&Missing, LogContext::new());

        let notices = fixture.notices.take();
        let ErrorNotice::Detailed { key, context } = &notices[0] else {
            panic!("expected a detailed notice");
        };
        assert_eq!(key, "locale.translations_not_found");
        assert_eq!(context.get("kind"), Some(&json!("not_found")));
        assert_eq!(context.get("error"), Some(&json!("translation file is gone")));
    }

    #[test]
    fn unhandled_errors_record_type_message_and_location() {
        let fixture = Fixture::new(true);
        let err = std::fs::read("/definitely/not/here").unwrap_err();

        let line = line!() + 1;
        fixture.reporter.handle_exception(err);

        let notices = fixture.notices.take();
        let ErrorNotice::Detailed { key, context } = &notices[0] else {
            panic!("expected a detailed notice");
        };
        assert_eq!(key, UNHANDLED_EXCEPTION_KEY);
        assert!(
            context
                .get("exceptionClass")
                .and_then(|class| class.as_str())
                .is_some_and(|class| class.starts_with("std::io::") && class.ends_with("Error"))
        );
        assert_eq!(context.get("line"), Some(&json!(line)));
        assert!(
            context
                .get("file")
                .and_then(|file| file.as_str())
                .is_some_and(|file| file.ends_with("reporter.rs"))
        );
        assert!(context.contains_key("message"));
        assert!(context.contains_key("trace"));
        assert!(
            fixture
                .log_contents()
                .contains("[ErrorReporter] [handle_exception] [System] [error] exception.unhandled")
        );
    }

    #[test]
    fn a_broken_log_file_still_surfaces_the_notice() {
        let fixture = Fixture::with_log_path(true, "blocker/app.log");
        std::fs::write(fixture.dir.path().join("blocker"), "not a directory").unwrap();

        fixture
            .reporter
            .handle_error("payment.declined", LogContext::new());

        let notices = fixture.notices.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].key(), "payment.declined");
    }

    #[test]
    fn converted_errors_keep_their_root_cause() {
        let fixture = Fixture::new(true);
        let err = "seven".parse::<u32>().unwrap_err();

        fixture
            .reporter
            .handle_exception(anyhow::Error::new(err).context("reading the page size"));

        let notices = fixture.notices.take();
        let ErrorNotice::Detailed { context, .. } = &notices[0] else {
            panic!("expected a detailed notice");
        };
        assert!(
            context
                .get("exceptionClass")
                .and_then(|class| class.as_str())
                .is_some_and(|class| class.starts_with("anyhow::"))
        );
        assert_eq!(context.get("rootCause"), Some(&json!("ParseIntError")));
        assert_eq!(context.get("message"), Some(&json!("reading the page size")));
    }
}
