use crate::errors::{ErrorKind, Reportable};
use crate::session::id::{generate_session_id, is_valid_session_id};
use crate::session::{SessionData, SessionStore};
use chrono::{TimeDelta, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Session key of the signed in user, also shown in every log entry.
pub const KEY_USER_ID: &str = "user_id";

/// Session key of the locale the user picked.
pub const KEY_PREFERRED_LOCALE: &str = "preferred_locale";

/// Name of the cookie transporting the session identifier.
pub const SESSION_COOKIE_NAME: &str = "AMBIT_SESSION";

/// How a session has been started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStart {
    /// No (known) session was presented, a new one was created.
    Created,
    /// The presented session was picked up again under a new identifier.
    Resumed,
    /// The presented session had timed out and was replaced by an empty one.
    Restarted,
    /// The session had already been started in this scope.
    AlreadyActive,
}

/// Parameters of the cookie transporting the session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieParams {
    pub name: &'static str,
    pub http_only: bool,
    /// Only sent over TLS, enabled if the session was started over TLS.
    pub secure: bool,
    /// The identifier is only accepted from the cookie, never from the URL.
    pub cookie_only: bool,
}

impl CookieParams {
    fn for_transport(secure: bool) -> Self {
        Self {
            name: SESSION_COOKIE_NAME,
            http_only: true,
            secure,
            cookie_only: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to {operation} session state: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },
}

impl SessionError {
    fn store(operation: &'static str, err: anyhow::Error) -> Self {
        SessionError::Store {
            operation,
            message: format!("{:#}", err),
        }
    }
}

impl Reportable for SessionError {
    fn message_key(&self) -> &'static str {
        match self {
            SessionError::Store { operation: "load" | "save", .. } => "session.start_failed",
            SessionError::Store { operation: "persist", .. } => "session.persist_failed",
            SessionError::Store { .. } => "session.destroy_failed",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

#[derive(Default)]
struct SessionState {
    id: Option<String>,
    cookie: Option<CookieParams>,
    data: SessionData,
}

/// The session state of one client, scoped to one request.
///
/// State lives in memory while the request is served: [`Self::start`] loads it from the
/// [`SessionStore`], [`Self::persist`] writes it back. Until a session has been started,
/// reads see an empty session.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    timeout: TimeDelta,
    state: Mutex<SessionState>,
    start_lock: tokio::sync::Mutex<()>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout: TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX),
            state: Mutex::new(SessionState::default()),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the session presented by the client (if any).
    ///
    /// Idempotent within one scope. A presented session idle for longer than the timeout
    /// is destroyed before a fresh one is built. On every successful start the identifier
    /// is regenerated: the state is stored under a new identifier and the presented one
    /// is removed from the store.
    pub async fn start(
        &self,
        presented_id: Option<&str>,
        secure_transport: bool,
    ) -> Result<SessionStart, SessionError> {
        let _guard = self.start_lock.lock().await;
        if self.is_active() {
            return Ok(SessionStart::AlreadyActive);
        }

        let presented_id = presented_id.filter(|id| is_valid_session_id(id));
        let previous = match presented_id {
            Some(id) => self
                .store
                .load(id)
                .await
                .map_err(|err| SessionError::store("load", err))?,
            None => None,
        };

        let now = Utc::now();
        let (mut data, outcome) = match previous {
            Some(data) if data.is_expired(self.timeout, now) => {
                if let Some(id) = presented_id {
                    self.store
                        .delete(id)
                        .await
                        .map_err(|err| SessionError::store("load", err))?;
                }
                (SessionData::created_at(now), SessionStart::Restarted)
            }
            Some(data) => (data, SessionStart::Resumed),
            None => (SessionData::created_at(now), SessionStart::Created),
        };
        data.last_activity = now;

        let id = generate_session_id();
        self.store
            .save(&id, &data)
            .await
            .map_err(|err| SessionError::store("save", err))?;

        if outcome == SessionStart::Resumed
            && let Some(old_id) = presented_id
            && let Err(err) = self.store.delete(old_id).await
        {
            tracing::warn!("Failed to remove replaced session identifier: {:#}", err);
        }

        let mut state = self.lock();
        state.id = Some(id);
        state.cookie = Some(CookieParams::for_transport(secure_transport));
        state.data = data;

        Ok(outcome)
    }

    /// Determines if the session has been started in this scope.
    pub fn is_active(&self) -> bool {
        self.lock().id.is_some()
    }

    /// The current identifier, to be sent back to the client.
    pub fn session_id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    /// Parameters for the session cookie, once started.
    pub fn cookie_params(&self) -> Option<CookieParams> {
        self.lock().cookie
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.lock();
        state.data.values.insert(key.into(), value.into());
        state.data.touch();
    }

    /// Returns the value stored for `key`, `None` if there is none.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        state.data.touch();
        state.data.values.get(key).cloned()
    }

    /// Returns the value stored for `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().data.values.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().data.values.remove(key)
    }

    /// Clears all state and forgets the identifier, also removing it from the store.
    pub async fn destroy_session(&self) -> Result<(), SessionError> {
        let id = {
            let mut state = self.lock();
            std::mem::take(&mut *state).id
        };

        if let Some(id) = id {
            self.store
                .delete(&id)
                .await
                .map_err(|err| SessionError::store("destroy", err))?;
        }

        Ok(())
    }

    /// Writes the in-memory state back to the store.
    ///
    /// Returns `false` if the session was never started.
    pub async fn persist(&self) -> Result<bool, SessionError> {
        let Some((id, data)) = ({
            let state = self.lock();
            state.id.clone().map(|id| (id, state.data.clone()))
        }) else {
            return Ok(false);
        };

        self.store
            .save(&id, &data)
            .await
            .map_err(|err| SessionError::store("persist", err))?;

        Ok(true)
    }

    /// Stores a message which can be read exactly once.
    pub fn set_flash(&self, key: impl Into<String>, message: impl Into<String>) {
        self.lock().data.flash.insert(key.into(), message.into());
    }

    /// Reads and removes a flash message.
    pub fn get_flash(&self, key: &str) -> Option<String> {
        self.lock().data.flash.remove(key)
    }

    pub fn set_user_auth_data(&self, data: impl Into<Value>) {
        self.lock().data.auth = Some(data.into());
    }

    pub fn get_user_auth_data(&self) -> Option<Value> {
        self.lock().data.auth.clone()
    }

    pub fn set_user_preferred_locale(&self, locale: &str) {
        self.set(KEY_PREFERRED_LOCALE, locale);
    }

    pub fn get_user_preferred_locale(&self) -> Option<String> {
        self.get_str(KEY_PREFERRED_LOCALE)
            .filter(|locale| !locale.is_empty())
    }

    /// The id of the signed in user, if any.
    pub fn user_id(&self) -> Option<String> {
        match self.get(KEY_USER_ID)? {
            Value::String(id) if !id.is_empty() => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(1800);

    fn service(store: &Arc<MemorySessionStore>) -> SessionService {
        SessionService::new(store.clone(), TIMEOUT)
    }

    async fn seed(store: &MemorySessionStore, idle_seconds: i64) -> String {
        let mut data = SessionData::created_at(Utc::now() - TimeDelta::seconds(idle_seconds));
        data.values.insert("cart".to_owned(), json!(["book"]));
        let id = generate_session_id();
        store.save(&id, &data).await.unwrap();
        id
    }

    #[tokio::test]
    async fn creates_a_session_with_secure_cookie_params() {
        let store = Arc::new(MemorySessionStore::new());
        let session = service(&store);

        assert!(!session.is_active());
        assert_eq!(session.start(None, true).await.unwrap(), SessionStart::Created);
        assert!(session.is_active());

        let cookie = session.cookie_params().unwrap();
        assert!(cookie.http_only && cookie.secure && cookie.cookie_only);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let store = Arc::new(MemorySessionStore::new());
        let session = service(&store);

        session.start(None, false).await.unwrap();
        let id = session.session_id();

        assert_eq!(
            session.start(None, false).await.unwrap(),
            SessionStart::AlreadyActive
        );
        assert_eq!(session.session_id(), id);
        assert!(!session.cookie_params().unwrap().secure);
    }

    #[tokio::test]
    async fn resumes_with_a_regenerated_identifier() {
        let store = Arc::new(MemorySessionStore::new());
        let old_id = seed(&store, 60).await;
        let session = service(&store);

        assert_eq!(
            session.start(Some(&old_id), false).await.unwrap(),
            SessionStart::Resumed
        );

        let new_id = session.session_id().unwrap();
        assert_ne!(new_id, old_id);
        assert_eq!(session.get("cart"), Some(json!(["book"])));
        assert_eq!(store.load(&old_id).await.unwrap(), None);
        assert!(store.load(&new_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn timed_out_sessions_lose_their_data() {
        let store = Arc::new(MemorySessionStore::new());
        let old_id = seed(&store, 1801).await;
        let session = service(&store);

        assert_eq!(
            session.start(Some(&old_id), false).await.unwrap(),
            SessionStart::Restarted
        );

        assert_eq!(session.get("cart"), None);
        assert_eq!(store.load(&old_id).await.unwrap(), None);
        assert_ne!(session.session_id().unwrap(), old_id);
    }

    #[tokio::test]
    async fn unknown_or_malformed_identifiers_create_new_sessions() {
        let store = Arc::new(MemorySessionStore::new());

        let session = service(&store);
        assert_eq!(
            session.start(Some("../../etc/passwd"), false).await.unwrap(),
            SessionStart::Created
        );

        let session = service(&store);
        assert_eq!(
            session
                .start(Some(&generate_session_id()), false)
                .await
                .unwrap(),
            SessionStart::Created
        );
    }

    #[tokio::test]
    async fn values_round_trip_and_missing_keys_are_absent() {
        let store = Arc::new(MemorySessionStore::new());
        let session = service(&store);
        session.start(None, false).await.unwrap();

        session.set("user_id", 42);
        session.set("theme", "dark");

        assert_eq!(session.user_id().as_deref(), Some("42"));
        assert_eq!(session.get_str("theme").as_deref(), Some("dark"));
        assert_eq!(session.get("missing"), None);
        assert!(session.contains("theme"));
        assert_eq!(session.remove("theme"), Some(json!("dark")));
        assert!(!session.contains("theme"));
    }

    #[tokio::test]
    async fn flash_messages_are_read_once() {
        let session = service(&Arc::new(MemorySessionStore::new()));
        session.start(None, false).await.unwrap();

        session.set_flash("notice", "Profile saved");

        assert_eq!(session.get_flash("notice").as_deref(), Some("Profile saved"));
        assert_eq!(session.get_flash("notice"), None);
    }

    #[tokio::test]
    async fn auth_data_and_preferred_locale() {
        let session = service(&Arc::new(MemorySessionStore::new()));
        session.start(None, false).await.unwrap();

        assert_eq!(session.get_user_auth_data(), None);
        assert_eq!(session.get_user_preferred_locale(), None);

        session.set_user_auth_data(json!({"roles": ["admin"]}));
        session.set_user_preferred_locale("fr");

        assert_eq!(session.get_user_auth_data(), Some(json!({"roles": ["admin"]})));
        assert_eq!(session.get_user_preferred_locale().as_deref(), Some("fr"));
        assert_eq!(session.get_str(KEY_PREFERRED_LOCALE).as_deref(), Some("fr"));
    }

    #[tokio::test]
    async fn persist_and_destroy() {
        let store = Arc::new(MemorySessionStore::new());
        let session = service(&store);

        assert!(!session.persist().await.unwrap());

        session.start(None, false).await.unwrap();
        session.set("user_id", "u-1");
        assert!(session.persist().await.unwrap());

        let id = session.session_id().unwrap();
        let stored = store.load(&id).await.unwrap().unwrap();
        assert_eq!(stored.values.get("user_id"), Some(&json!("u-1")));

        session.destroy_session().await.unwrap();
        assert!(!session.is_active());
        assert_eq!(session.get("user_id"), None);
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn load(&self, _id: &str) -> anyhow::Result<Option<SessionData>> {
            anyhow::bail!("store offline")
        }

        async fn save(&self, _id: &str, _data: &SessionData) -> anyhow::Result<()> {
            anyhow::bail!("store offline")
        }

        async fn delete(&self, _id: &str) -> anyhow::Result<()> {
            anyhow::bail!("store offline")
        }
    }

    #[tokio::test]
    async fn store_failures_leave_an_empty_unstarted_session() {
        let session = SessionService::new(Arc::new(BrokenStore), TIMEOUT);

        let err = session.start(None, false).await.unwrap_err();

        assert_eq!(err.message_key(), "session.start_failed");
        assert!(err.to_string().contains("store offline"));
        assert!(!session.is_active());
        assert_eq!(session.get("user_id"), None);
    }
}
