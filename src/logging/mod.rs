//! Logging infrastructure.
//!
//! Two outputs exist side by side:
//!
//! - **Console tracing** - set up once via [`setup_tracing`], respects `RUST_LOG`
//! - **Durable log file** - written by the [`LogService`] of each request scope, one
//!   line per entry, see [`entry`] for the format
//!
//! Every entry written by a [`LogService`] is mirrored to the console as well.
//!
//! # Usage
//!
//! ```rust,ignore
//! fn main() {
//!     ambit::logging::setup_tracing();
//!     // ... build the services and serve requests
//! }
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RUST_LOG` | Console log filter (e.g., `info`, `ambit=debug`) | `info` |

use crate::{APP_NAME, APP_VERSION};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub mod entry;
mod file;
mod production;
mod service;

pub use entry::{Level, LogContext, LogEntry};
pub use file::{LogError, LogFile};
pub use service::LogService;

/// Initializes the console tracing subscriber.
///
/// Should be called once at application startup. Later calls leave the already
/// installed subscriber in place and only emit a warning.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(production::ConsoleLogFormat)
        .with_filter(filter)
        .boxed();

    match Registry::default().with(console_layer).try_init() {
        Ok(()) => tracing::info!(
            "Tracing initialized for {} ({}) [reporting to console]",
            APP_NAME.as_str(),
            APP_VERSION.as_str()
        ),
        Err(err) => tracing::warn!("Tracing was already initialized: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_setup_tolerates_repeated_calls() {
        setup_tracing();
        setup_tracing();

        tracing::info!(module = "LogService", "still reporting");
    }
}
