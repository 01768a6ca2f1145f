use crate::session::SessionData;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Persistence of session state, keyed by the identifier presented by the client.
///
/// Provided by the host environment. Implementations must be safe to share across
/// all concurrently served requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the state stored for `id`, `None` if there is none.
    async fn load(&self, id: &str) -> anyhow::Result<Option<SessionData>>;

    /// Stores (or replaces) the state for `id`.
    async fn save(&self, id: &str, data: &SessionData) -> anyhow::Result<()>;

    /// Removes the state for `id`. Removing an unknown id is not an error.
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

/// Keeps all sessions in memory. Suitable for a single node and for tests.
///
/// With a timeout, every save also drops all sessions idle for longer than that, so
/// abandoned sessions do not pile up.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
    timeout: Option<TimeDelta>,
}

impl MemorySessionStore {
    /// Creates a store which keeps sessions until they are deleted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store which discards sessions idle for longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::default(),
            timeout: Some(TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> anyhow::Result<Option<SessionData>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save(&self, id: &str, data: &SessionData) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(timeout) = self.timeout {
            let now = Utc::now();
            sessions.retain(|_, session| !session.is_expired(timeout, now));
        }
        sessions.insert(id.to_owned(), data.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}
