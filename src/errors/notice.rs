use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Message key shown to users when error details are not displayed.
pub const GENERIC_ERROR_KEY: &str = "error.generic";

/// What a user gets to see about a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ErrorNotice {
    /// The full message key and context (`error_handling.display_errors` enabled).
    Detailed {
        key: String,
        context: BTreeMap<String, Value>,
    },
    /// A generic message which does not leak internals.
    Generic { key: &'static str },
}

impl ErrorNotice {
    /// The message key to translate when rendering the notice.
    pub fn key(&self) -> &str {
        match self {
            ErrorNotice::Detailed { key, .. } => key,
            ErrorNotice::Generic { key } => key,
        }
    }
}

/// The response channel notices are surfaced to.
pub trait NoticeSink: Send + Sync {
    fn surface(&self, notice: ErrorNotice);
}

/// Collects the notices of one request until the response is rendered.
#[derive(Debug, Default)]
pub struct NoticeBuffer {
    notices: Mutex<Vec<ErrorNotice>>,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all collected notices.
    pub fn take(&self) -> Vec<ErrorNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeSink for NoticeBuffer {
    fn surface(&self, notice: ErrorNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
