use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The state of one client session as kept in a [`super::SessionStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Plain key/value entries.
    #[serde(default)]
    pub values: HashMap<String, Value>,
    /// Messages which are removed once read.
    #[serde(default)]
    pub flash: HashMap<String, String>,
    /// Opaque authentication data of the signed in user.
    #[serde(default)]
    pub auth: Option<Value>,
    pub last_activity: DateTime<Utc>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::created_at(Utc::now())
    }

    pub fn created_at(now: DateTime<Utc>) -> Self {
        Self {
            values: HashMap::new(),
            flash: HashMap::new(),
            auth: None,
            last_activity: now,
        }
    }

    /// Determines if the session has been idle for longer than `timeout`.
    pub fn is_expired(&self, timeout: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.last_activity > timeout
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}
