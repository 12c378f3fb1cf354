//! Session state object shared between middleware and stores.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a session, attached to request extensions.
///
/// Mutations through the handle are visible to the owning store immediately;
/// there is no separate save step for in-memory sessions.
pub type SharedSession = Arc<Mutex<Session>>;

/// Per-client session state.
///
/// Holds arbitrary key-value data as JSON values plus bookkeeping timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last access timestamp
    pub last_accessed_at: DateTime<Utc>,
    /// Session expiration timestamp
    pub expires_at: DateTime<Utc>,
    data: HashMap<String, serde_json::Value>,
}

impl Session {
    /// Create a new session with the given ID and TTL.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
            data: HashMap::new(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Get a value from the session data.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all session data.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Update the last accessed timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Extend the session expiration.
    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
    }
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
