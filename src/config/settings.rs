use crate::config::{ConfigSource, EnvConfig};
use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const KEY_SESSION_TIMEOUT: &str = "session.timeout";
pub const KEY_DEFAULT_LOCALE: &str = "localization.default_locale";
pub const KEY_TRANSLATIONS_PATH: &str = "localization.translations_path";
pub const KEY_AVAILABLE_LOCALES: &str = "localization.available_locales";
pub const KEY_LOG_FILE_PATH: &str = "logFilePath";
pub const KEY_DISPLAY_ERRORS: &str = "error_handling.display_errors";

/// Sessions idle for longer than this are discarded on the next start (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: u64 = 1800;
pub const DEFAULT_LOCALE: &str = "en";
const DEFAULT_TRANSLATIONS_PATH: &str = "translations";
const DEFAULT_AVAILABLE_LOCALES: &str = "en,es,fr";
const DEFAULT_LOG_FILE_PATH: &str = "logs/app.log";

/// Typed configuration of the service graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub session_timeout: Duration,
    pub default_locale: String,
    pub translations_path: PathBuf,
    /// Offered locales. Advisory only, resolution does not enforce it.
    pub available_locales: Vec<String>,
    pub log_file_path: PathBuf,
    /// Whether error details are surfaced to users instead of a generic message.
    pub display_errors: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECONDS),
            default_locale: DEFAULT_LOCALE.to_owned(),
            translations_path: PathBuf::from(DEFAULT_TRANSLATIONS_PATH),
            available_locales: split_list(DEFAULT_AVAILABLE_LOCALES),
            log_file_path: PathBuf::from(DEFAULT_LOG_FILE_PATH),
            display_errors: false,
        }
    }
}

impl Settings {
    /// Reads all settings from the given source, falling back to the defaults.
    ///
    /// Fails if a value is present but cannot be parsed.
    pub fn load(source: &dyn ConfigSource) -> anyhow::Result<Self> {
        let timeout_seconds = parse_or(
            source,
            KEY_SESSION_TIMEOUT,
            DEFAULT_SESSION_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            session_timeout: Duration::from_secs(timeout_seconds),
            default_locale: source.get_or(KEY_DEFAULT_LOCALE, DEFAULT_LOCALE),
            translations_path: PathBuf::from(
                source.get_or(KEY_TRANSLATIONS_PATH, DEFAULT_TRANSLATIONS_PATH),
            ),
            available_locales: split_list(
                &source.get_or(KEY_AVAILABLE_LOCALES, DEFAULT_AVAILABLE_LOCALES),
            ),
            log_file_path: PathBuf::from(source.get_or(KEY_LOG_FILE_PATH, DEFAULT_LOG_FILE_PATH)),
            display_errors: parse_flag(source, KEY_DISPLAY_ERRORS)?,
        })
    }

    /// Reads all settings from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(&EnvConfig::new())
    }
}

fn parse_or<T>(source: &dyn ConfigSource, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match source.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value '{}' for '{}'", value, key)),
        None => Ok(default),
    }
}

fn parse_flag(source: &dyn ConfigSource, key: &str) -> anyhow::Result<bool> {
    match source.get(key).map(|value| value.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => anyhow::bail!("Invalid flag '{}' for '{}'", value, key),
        },
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;

    #[test]
    fn defaults_apply_to_an_empty_source() {
        let settings = Settings::load(&MapConfig::new()).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.session_timeout, Duration::from_secs(1800));
        assert_eq!(settings.default_locale, "en");
        assert_eq!(settings.available_locales, vec!["en", "es", "fr"]);
        assert!(!settings.display_errors);
    }

    #[test]
    fn values_are_read_and_parsed() {
        let source = MapConfig::new()
            .with(KEY_SESSION_TIMEOUT, " 60 ")
            .with(KEY_DEFAULT_LOCALE, "fr_FR")
            .with(KEY_TRANSLATIONS_PATH, "/srv/i18n")
            .with(KEY_AVAILABLE_LOCALES, "fr_FR, de ,")
            .with(KEY_LOG_FILE_PATH, "/var/log/app/app.log")
            .with(KEY_DISPLAY_ERRORS, "On");

        let settings = Settings::load(&source).unwrap();

        assert_eq!(settings.session_timeout, Duration::from_secs(60));
        assert_eq!(settings.default_locale, "fr_FR");
        assert_eq!(settings.translations_path, PathBuf::from("/srv/i18n"));
        assert_eq!(settings.available_locales, vec!["fr_FR", "de"]);
        assert_eq!(settings.log_file_path, PathBuf::from("/var/log/app/app.log"));
        assert!(settings.display_errors);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = Settings::load(&MapConfig::new().with(KEY_SESSION_TIMEOUT, "half an hour"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("session.timeout"));

        assert!(Settings::load(&MapConfig::new().with(KEY_DISPLAY_ERRORS, "maybe")).is_err());
    }
}
