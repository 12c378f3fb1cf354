//! Session store trait and in-memory backend.

use crate::error::SessionResult;
use crate::session::{generate_session_id, Session, SharedSession};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default TTL for new sessions when none is given.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Session store trait for different storage backends.
///
/// Stores hand out [`SharedSession`] handles; for in-memory backends the
/// handle aliases the stored session, so mutations need no save call.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session with an optional custom TTL.
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<SharedSession>;

    /// Get a session by ID. Returns `Ok(None)` if not found or expired.
    async fn get(&self, session_id: &str) -> SessionResult<Option<SharedSession>>;

    /// Delete a session.
    async fn delete(&self, session_id: &str) -> SessionResult<()>;

    /// Check if a session exists and is valid.
    async fn exists(&self, session_id: &str) -> SessionResult<bool>;

    /// Get the number of active sessions.
    async fn count(&self) -> SessionResult<usize>;

    /// Remove expired sessions, returning how many were dropped.
    async fn cleanup_expired(&self) -> SessionResult<usize>;
}

/// In-memory session store (single instance only).
pub struct MemorySessionStore {
    sessions: DashMap<String, SharedSession>,
    default_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            default_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<SharedSession> {
        let id = generate_session_id();
        let session = Session::new(id.clone(), ttl.unwrap_or(self.default_ttl));
        let handle: SharedSession = Arc::new(Mutex::new(session));
        self.sessions.insert(id.clone(), handle.clone());
        debug!(session_id = %id, "session created");
        Ok(handle)
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<SharedSession>> {
        let Some(entry) = self.sessions.get(session_id) else {
            return Ok(None);
        };
        let handle = entry.value().clone();
        drop(entry);

        if handle.lock().is_expired() {
            self.sessions.remove(session_id);
            debug!(session_id = %session_id, "expired session dropped on access");
            return Ok(None);
        }

        handle.lock().touch();
        Ok(Some(handle))
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        Ok(self.get(session_id).await?.is_some())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| !handle.lock().is_expired());
        let dropped = before - self.sessions.len();
        if dropped > 0 {
            debug!(dropped, "expired sessions cleaned up");
        }
        Ok(dropped)
    }
}
