//! Per client session state.
//!
//! [`SessionService`] owns the state of one client for the duration of a request, backed by
//! a shared [`SessionStore`]. It does not log: outcomes are returned to the request scope,
//! which records them.

mod data;
pub mod id;
mod service;
mod store;

pub use data::SessionData;
pub use service::{
    CookieParams, KEY_PREFERRED_LOCALE, KEY_USER_ID, SESSION_COOKIE_NAME, SessionError,
    SessionService, SessionStart,
};
pub use store::{MemorySessionStore, SessionStore};
