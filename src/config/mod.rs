//! Configuration sources and typed settings.
//!
//! The services only ever ask a [`ConfigSource`] for a flat key like
//! `localization.default_locale`. [`EnvConfig`] maps such keys onto environment
//! variables (`LOCALIZATION_DEFAULT_LOCALE`), [`MapConfig`] holds literals and
//! [`LayeredConfig`] combines several sources where the first hit wins.
//!
//! [`Settings`] turns the raw values into the typed configuration used to build the
//! service graph.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

mod settings;

pub use settings::Settings;

/// Read-only access to flat configuration values.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the raw value for `key` or the given default.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads configuration keys from environment variables.
///
/// `session.timeout` becomes `SESSION_TIMEOUT` and `logFilePath` becomes `LOG_FILE_PATH`,
/// see [`env_var_name`].
#[derive(Clone)]
pub struct EnvConfig {
    lookup: EnvLookup,
}

impl EnvConfig {
    /// Creates a source backed by the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|name| env::var(name).ok())
    }

    /// Creates a source backed by a custom lookup for environment variable names.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&env_var_name(key)).filter(|value| !value.is_empty())
    }
}

/// Converts a configuration key into the name of its environment variable.
///
/// Dots become underscores and camel case humps are split:
/// `error_handling.display_errors` -> `ERROR_HANDLING_DISPLAY_ERRORS`,
/// `logFilePath` -> `LOG_FILE_PATH`.
pub fn env_var_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 4);
    let mut previous_lower = false;

    for ch in key.chars() {
        if ch == '.' || ch == '-' {
            name.push('_');
            previous_lower = false;
        } else if ch.is_ascii_uppercase() {
            if previous_lower {
                name.push('_');
            }
            name.push(ch);
            previous_lower = false;
        } else {
            name.push(ch.to_ascii_uppercase());
            previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }

    name
}

/// Configuration given as literal key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Combines several sources, asking them in order until one has a value.
#[derive(Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source with lower priority than all sources added before.
    pub fn with_layer(mut self, layer: impl ConfigSource + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }
}

impl ConfigSource for LayeredConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}
