//! The process wide installation slot.
//!
//! Hosts which cannot pass [`Services`] around install it once at startup and fetch it
//! via [`current`] wherever a request is served.

use crate::errors::{ErrorKind, Reportable};
use crate::services::Services;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use thiserror::Error;

static INSTALLED: ArcSwapOption<Services> = ArcSwapOption::const_empty();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServicesError {
    #[error("No services have been installed")]
    NotConfigured,
    #[error("Services have already been installed")]
    AlreadyInstalled,
}

impl Reportable for ServicesError {
    fn message_key(&self) -> &'static str {
        match self {
            ServicesError::NotConfigured => "services.not_configured",
            ServicesError::AlreadyInstalled => "services.already_installed",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Unhandled
    }
}

/// Installs the services of this process.
///
/// Fails if services are already installed, use [`replace`] to reconfigure.
pub fn install(services: Services) -> Result<Arc<Services>, ServicesError> {
    let services = Arc::new(services);
    let previous = INSTALLED.compare_and_swap(&None::<Arc<Services>>, Some(services.clone()));
    if previous.is_some() {
        return Err(ServicesError::AlreadyInstalled);
    }

    tracing::info!("Services installed");
    Ok(services)
}

/// Installs the given services in place of the current ones, returning those.
pub fn replace(services: Services) -> Option<Arc<Services>> {
    tracing::info!("Replacing installed services");
    INSTALLED.swap(Some(Arc::new(services)))
}

/// Removes the installed services.
pub fn reset() -> Option<Arc<Services>> {
    INSTALLED.swap(None)
}

/// Returns the installed services.
pub fn current() -> Result<Arc<Services>, ServicesError> {
    INSTALLED.load_full().ok_or(ServicesError::NotConfigured)
}
