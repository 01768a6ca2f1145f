use crate::errors::ErrorReporter;
use crate::locale::{LocaleError, TranslationTable};
use crate::logging::{LogContext, LogService};
use crate::session::SessionService;
use arc_swap::ArcSwapOption;
use std::path::PathBuf;
use std::sync::Arc;

const MODULE: &str = "LocaleService";
const SESSION_MODULE: &str = "SessionService";

/// Lifecycle of a [`LocaleService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePhase {
    Uninitialized,
    LocaleResolved,
    TranslationsLoaded,
}

/// Extracts the language of an `Accept-Language` style hint, e.g. `de` for
/// `de-CH,de;q=0.9`.
///
/// Only the first two characters are considered and both have to be letters.
pub fn language_from_hint(hint: &str) -> Option<String> {
    let language = hint.trim().get(..2)?;
    language
        .chars()
        .all(|c| c.is_ascii_alphabetic())
        .then(|| language.to_ascii_lowercase())
}

/// Resolves the locale of a request and translates message keys.
///
/// The locale is taken from the preference stored in the session, the language hint
/// sent by the client or the given default, in this order. Failures to load a
/// translation table are reported and leave the service translating every key to
/// itself.
pub struct LocaleService {
    session: Arc<SessionService>,
    log: Arc<LogService>,
    errors: Arc<ErrorReporter>,
    translations_root: PathBuf,
    available_locales: Vec<String>,
    client_hint: Option<String>,
    locale: ArcSwapOption<String>,
    table: ArcSwapOption<TranslationTable>,
}

impl LocaleService {
    pub fn new(
        session: Arc<SessionService>,
        log: Arc<LogService>,
        errors: Arc<ErrorReporter>,
        translations_root: impl Into<PathBuf>,
        available_locales: Vec<String>,
        client_hint: Option<String>,
    ) -> Self {
        Self {
            session,
            log,
            errors,
            translations_root: translations_root.into(),
            available_locales,
            client_hint,
            locale: ArcSwapOption::empty(),
            table: ArcSwapOption::empty(),
        }
    }

    pub fn state(&self) -> LocalePhase {
        if self.locale.load().is_none() {
            LocalePhase::Uninitialized
        } else if self.table.load().is_some() {
            LocalePhase::TranslationsLoaded
        } else {
            LocalePhase::LocaleResolved
        }
    }

    /// The resolved locale, `None` before [`Self::resolve_locale`] ran.
    pub fn locale(&self) -> Option<String> {
        self.locale.load_full().map(|locale| locale.as_ref().clone())
    }

    /// Determines if translations for `code` are shipped. Not enforced on resolution.
    pub fn is_available(&self, code: &str) -> bool {
        self.available_locales.iter().any(|locale| locale == code)
    }

    /// Determines the locale of this request and drops any previously loaded table.
    pub fn resolve_locale(&self, default: &str) -> String {
        let locale = self
            .preferred_locale()
            .or_else(|| self.client_hint.as_deref().and_then(language_from_hint))
            .unwrap_or_else(|| default.to_owned());

        if !self.is_available(&locale) {
            tracing::debug!("Resolved locale '{}' is not among the available locales", locale);
        }

        self.locale.store(Some(Arc::new(locale.clone())));
        self.table.store(None);
        self.log.info(
            "locale.resolved",
            &LogContext::for_module(MODULE)
                .function("resolve_locale")
                .with("locale", locale.as_str()),
        );

        locale
    }

    /// Reads the locale stored in the session, logging whether there is one.
    fn preferred_locale(&self) -> Option<String> {
        let context = LogContext::for_module(SESSION_MODULE).function("get_user_preferred_locale");
        match self.session.get_user_preferred_locale() {
            Some(locale) => {
                self.log.info(
                    "session.get_preferred_locale",
                    &context.with("locale", locale.as_str()),
                );
                Some(locale)
            }
            None => {
                self.log.warning("session.get_preferred_locale_missing", &context);
                None
            }
        }
    }

    /// Stores `code` as the preference of the user and makes it the active locale.
    ///
    /// The translation table has to be loaded again afterwards.
    pub fn set_locale(&self, code: &str) -> String {
        self.session.set_user_preferred_locale(code);
        self.resolve_locale(code)
    }

    /// Loads the translation table of the resolved locale.
    ///
    /// Returns the number of loaded entries. On failure the error is reported and the
    /// service is left with no translations.
    pub fn load_translations(&self) -> Result<usize, LocaleError> {
        let context = LogContext::for_module(MODULE).function("load_translations");

        let result = match self.locale.load_full() {
            Some(locale) => TranslationTable::load(&self.translations_root, &locale),
            None => Err(LocaleError::Unresolved),
        };

        match result {
            Ok(table) => {
                let count = table.len();
                let context = context
                    .with("locale", table.locale())
                    .with("count", count);
                self.table.store(Some(Arc::new(table)));
                self.log.info("locale.translations_loaded", &context);
                Ok(count)
            }
            Err(err) => {
                self.table.store(None);
                self.errors.report(&err, context);
                Err(err)
            }
        }
    }

    /// Resolves the locale and loads its translations.
    pub fn initialize(&self, default: &str) -> Result<usize, LocaleError> {
        self.resolve_locale(default);
        self.load_translations()
    }

    /// Returns the translation of `key`, or the key itself if there is none.
    pub fn translate(&self, key: &str) -> String {
        let table = self.table.load_full();
        if let Some(text) = table.as_deref().and_then(|table| table.get(key)) {
            return text.to_owned();
        }

        self.log.warning(
            "locale.translation_not_found",
            &LogContext::for_module(MODULE)
                .function("translate")
                .with("key", key),
        );
        key.to_owned()
    }
}
