//! Wiring of the service graph.
//!
//! [`Services`] holds everything shared by all requests: the settings, the log file and
//! the session store. For every request it builds a [`RequestScope`] containing the
//! session, logging, error and locale services of that one client:
//!
//! ```text
//! LocaleService ──> SessionService <── LogService <──> ErrorReporter
//!       │                                  ^                 ^
//!       └──────────────────────────────────┴─────────────────┘
//! ```
//!
//! The log service holds the reporter weakly, everything else is shared via `Arc`.

use crate::config::{ConfigSource, Settings};
use crate::errors::{ErrorNotice, ErrorReporter, NoticeBuffer};
use crate::locale::{LocaleError, LocaleService};
use crate::logging::{LogContext, LogFile, LogService};
use crate::session::{MemorySessionStore, SessionService, SessionStart, SessionStore};
use std::sync::Arc;

mod global;

pub use global::{ServicesError, current, install, replace, reset};

const SESSION_MODULE: &str = "SessionService";

/// The process wide part of the service graph.
pub struct Services {
    settings: Settings,
    log_file: Arc<LogFile>,
    store: Arc<dyn SessionStore>,
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    /// Builds the services from the process environment, keeping sessions in memory.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::builder().build()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn log_file(&self) -> &Arc<LogFile> {
        &self.log_file
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Builds the services of one request.
    pub fn scope(&self, request: ClientRequest) -> RequestScope {
        let notices = Arc::new(NoticeBuffer::new());
        let session = Arc::new(SessionService::new(
            self.store.clone(),
            self.settings.session_timeout,
        ));
        let reporter = Arc::new_cyclic(|reporter| {
            let log = Arc::new(LogService::new(
                self.log_file.clone(),
                session.clone(),
                reporter.clone(),
            ));
            ErrorReporter::new(log, self.settings.display_errors, notices.clone())
        });
        let locale = LocaleService::new(
            session.clone(),
            reporter.log_service().clone(),
            reporter.clone(),
            self.settings.translations_path.clone(),
            self.settings.available_locales.clone(),
            request.language_hint.clone(),
        );

        RequestScope {
            request,
            default_locale: self.settings.default_locale.clone(),
            session,
            reporter,
            locale,
            notices,
        }
    }
}

/// Assembles [`Services`].
///
/// Settings are taken from (in this order) [`Self::settings`], [`Self::config`] or the
/// process environment. Without a [`Self::store`], sessions are kept in memory and
/// dropped once they time out.
#[derive(Default)]
pub struct ServicesBuilder {
    settings: Option<Settings>,
    config: Option<Box<dyn ConfigSource>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl ServicesBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn config(mut self, source: impl ConfigSource + 'static) -> Self {
        self.config = Some(Box::new(source));
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> anyhow::Result<Services> {
        let settings = match (self.settings, self.config) {
            (Some(settings), _) => settings,
            (None, Some(source)) => Settings::load(&*source)?,
            (None, None) => Settings::from_env()?,
        };

        tracing::info!(
            "Services configured: log file '{}', translations in '{}', session timeout {}s",
            settings.log_file_path.display(),
            settings.translations_path.display(),
            settings.session_timeout.as_secs()
        );

        Ok(Services {
            log_file: Arc::new(LogFile::new(settings.log_file_path.clone())),
            store: self.store.unwrap_or_else(|| {
                Arc::new(MemorySessionStore::with_timeout(settings.session_timeout))
            }),
            settings,
        })
    }
}

/// What the host knows about the client of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRequest {
    /// Session identifier presented in the session cookie.
    pub session_id: Option<String>,
    /// `Accept-Language` style language hint.
    pub language_hint: Option<String>,
    /// Whether the request arrived over TLS.
    pub secure: bool,
}

impl ClientRequest {
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// The services of one request.
pub struct RequestScope {
    request: ClientRequest,
    default_locale: String,
    session: Arc<SessionService>,
    reporter: Arc<ErrorReporter>,
    locale: LocaleService,
    notices: Arc<NoticeBuffer>,
}

impl RequestScope {
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    pub fn log(&self) -> &LogService {
        self.reporter.log_service()
    }

    pub fn errors(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn locale(&self) -> &LocaleService {
        &self.locale
    }

    /// Starts the session presented by the client and logs the outcome.
    ///
    /// A failing session store is reported, the session then stays unstarted and reads
    /// as empty.
    pub async fn start_session(&self) -> Option<SessionStart> {
        let context = LogContext::for_module(SESSION_MODULE).function("start");

        match self
            .session
            .start(self.request.session_id.as_deref(), self.request.secure)
            .await
        {
            Ok(SessionStart::AlreadyActive) => Some(SessionStart::AlreadyActive),
            Ok(SessionStart::Restarted) => {
                self.log().warning("session.timeout", &context);
                Some(SessionStart::Restarted)
            }
            Ok(outcome) => {
                self.log().info("session.start_success", &context);
                Some(outcome)
            }
            Err(err) => {
                self.reporter.report(&err, context);
                None
            }
        }
    }

    /// Destroys the session, reporting a failure to remove it from the store.
    pub async fn destroy_session(&self) -> bool {
        match self.session.destroy_session().await {
            Ok(()) => true,
            Err(err) => {
                self.reporter.report(
                    &err,
                    LogContext::for_module(SESSION_MODULE).function("destroy_session"),
                );
                false
            }
        }
    }

    /// Stores the preferred locale of the user and switches to it.
    pub fn set_preferred_locale(&self, code: &str) -> String {
        let locale = self.locale.set_locale(code);
        self.log().info(
            "session.set_preferred_locale",
            &LogContext::for_module(SESSION_MODULE)
                .function("set_user_preferred_locale")
                .with("locale", code),
        );
        locale
    }

    /// Resolves the locale of this request against the configured default and loads its
    /// translations.
    pub fn initialize_locale(&self) -> Result<usize, LocaleError> {
        self.locale.initialize(&self.default_locale)
    }

    /// Removes and returns the notices surfaced so far.
    pub fn take_notices(&self) -> Vec<ErrorNotice> {
        self.notices.take()
    }

    /// Completes the request: writes the session back and hands out all notices.
    pub async fn finish(&self) -> Vec<ErrorNotice> {
        if let Err(err) = self.session.persist().await {
            self.reporter.report(
                &err,
                LogContext::for_module(SESSION_MODULE).function("persist"),
            );
        }

        self.take_notices()
    }
}
