use crate::errors::{ErrorKind, Reportable};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest accepted locale code, e.g. `zh_Hant_TW`.
const MAX_CODE_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("No locale has been resolved yet")]
    Unresolved,
    #[error("Invalid locale code '{0}'")]
    InvalidCode(String),
    #[error("Translation file '{}' does not exist", .path.display())]
    NotFound { path: PathBuf },
    #[error("Cannot read translation file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Translation file '{}' is not a flat map of strings: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Reportable for LocaleError {
    fn message_key(&self) -> &'static str {
        match self {
            LocaleError::Unresolved => "locale.not_resolved",
            LocaleError::InvalidCode(_) => "locale.invalid_code",
            LocaleError::NotFound { .. } => "locale.translations_not_found",
            LocaleError::Read { .. } | LocaleError::Malformed { .. } => {
                "locale.translations_load_error"
            }
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            LocaleError::Unresolved => ErrorKind::Unhandled,
            LocaleError::InvalidCode(_) | LocaleError::Malformed { .. } => ErrorKind::MalformedData,
            LocaleError::NotFound { .. } => ErrorKind::NotFound,
            LocaleError::Read { .. } => ErrorKind::Transport,
        }
    }
}

/// Determines if `code` looks like a locale code (`en`, `fr_FR`, `pt-BR`).
///
/// Codes end up in a file name, so anything but ASCII letters, digits, `_` and `-` is
/// rejected.
pub fn is_valid_locale_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LENGTH
        && code.starts_with(|c: char| c.is_ascii_alphabetic())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The translations of exactly one locale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationTable {
    locale: String,
    entries: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new(locale: impl Into<String>, entries: HashMap<String, String>) -> Self {
        Self {
            locale: locale.into(),
            entries,
        }
    }

    /// The file the translations of `locale` are stored in.
    pub fn path_for(root: &Path, locale: &str) -> Result<PathBuf, LocaleError> {
        if !is_valid_locale_code(locale) {
            return Err(LocaleError::InvalidCode(locale.to_owned()));
        }

        Ok(root.join(format!("{}.json", locale)))
    }

    /// Reads `<root>/<locale>.json`.
    pub fn load(root: &Path, locale: &str) -> Result<Self, LocaleError> {
        let path = Self::path_for(root, locale)?;
        let contents = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LocaleError::NotFound { path: path.clone() }
            } else {
                LocaleError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let entries = serde_json::from_str(&contents)
            .map_err(|source| LocaleError::Malformed { path, source })?;

        Ok(Self::new(locale, entries))
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
