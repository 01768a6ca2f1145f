//! # Ambit
//!
//! Cross-cutting services shared by every request of a web application: session
//! lifecycle, durable structured logging, centralized error reporting and locale
//! resolution with translation tables.
//!
//! The services depend on each other (logging reads the session for the user identity,
//! error reporting logs, locale resolution uses all three). Instead of process globals,
//! a [`services::Services`] graph is built once at startup and hands out one
//! [`services::RequestScope`] per request, which owns the per-client session state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ambit::services::{ClientRequest, Services};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     ambit::logging::setup_tracing();
//!
//!     let services = Services::from_env()?;
//!     let scope = services.scope(ClientRequest::default().with_language_hint("de-DE"));
//!
//!     scope.start_session().await;
//!     scope.initialize_locale().ok();
//!     println!("{}", scope.locale().translate("greeting"));
//!
//!     scope.finish().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration sources and typed settings
//! - [`logging`] - Console tracing setup and the durable log file service
//! - [`errors`] - Error reporter, notices and the shared error taxonomy
//! - [`session`] - Session data, stores, identifiers and the session service
//! - [`locale`] - Locale resolution and translation tables
//! - [`services`] - Wiring of the service graph and request scopes
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_NAME` | Application identifier | `AMBIT` |
//! | `APP_VERSION` | Version string | `DEVELOPMENT-SNAPSHOT-VERSION` |
//! | `SESSION_TIMEOUT` | Session inactivity timeout in seconds | `1800` |
//! | `LOCALIZATION_DEFAULT_LOCALE` | Locale used when nothing else matches | `en` |
//! | `LOCALIZATION_TRANSLATIONS_PATH` | Directory containing `<locale>.json` files | `translations` |
//! | `LOCALIZATION_AVAILABLE_LOCALES` | Comma separated list of offered locales | `en,es,fr` |
//! | `LOG_FILE_PATH` | Durable log file | `logs/app.log` |
//! | `ERROR_HANDLING_DISPLAY_ERRORS` | Surface error details to users | `false` |
//! | `RUST_LOG` | Console log filter | `info` |

use std::env;
use std::sync::LazyLock;

/// Configuration sources and typed settings.
pub mod config;

/// Error reporting and the shared error taxonomy.
pub mod errors;

/// Locale resolution and translations.
pub mod locale;

/// Console tracing and the durable log file.
pub mod logging;

/// Session state and lifecycle.
pub mod session;

/// Service graph wiring and request scopes.
pub mod services;

/// Application name from `APP_NAME` environment variable.
///
/// Reported once when the console tracing is set up. Defaults to `"AMBIT"`.
pub static APP_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("APP_NAME").unwrap_or("AMBIT".to_string()));

/// Application version from `APP_VERSION` environment variable.
///
/// Typically set during CI/CD builds. Defaults to
/// `"DEVELOPMENT-SNAPSHOT-VERSION"` for local development.
pub static APP_VERSION: LazyLock<String> =
    LazyLock::new(|| env::var("APP_VERSION").unwrap_or("DEVELOPMENT-SNAPSHOT-VERSION".to_string()));
