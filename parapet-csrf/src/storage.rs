//! Token storage backends.
//!
//! The guard speaks to its storage collection only through [`TokenStorage`]:
//! an ordered `name -> value` mapping where insertion order drives FIFO
//! eviction. Two backends ship here: an in-process [`MemoryStorage`], and a
//! [`SessionStorage`] that keeps the mapping inside a shared session under a
//! namespace key so tokens survive across requests of one client.

use crate::error::{CsrfError, CsrfResult};
use async_trait::async_trait;
use parapet_session::{Session, SharedSession};
use parking_lot::Mutex;

/// Ordered token storage contract.
///
/// `set` on an existing name overwrites the value without changing the
/// entry's original insertion position.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Look up the value stored under `name`.
    async fn get(&self, name: &str) -> CsrfResult<Option<String>>;

    /// Insert or overwrite an entry.
    async fn set(&self, name: &str, value: &str) -> CsrfResult<()>;

    /// Delete an entry. Removing an absent name is not an error.
    async fn remove(&self, name: &str) -> CsrfResult<()>;

    /// Number of retained entries.
    async fn count(&self) -> CsrfResult<usize>;

    /// The earliest-inserted surviving key, if any. Drives eviction.
    async fn oldest_key(&self) -> CsrfResult<Option<String>>;

    /// The latest-inserted surviving key, if any. Drives persistent-mode
    /// token reuse.
    async fn newest_key(&self) -> CsrfResult<Option<String>>;

    /// Backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

/// In-memory token storage (single process).
pub struct MemoryStorage {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn get(&self, name: &str) -> CsrfResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    async fn set(&self, name: &str, value: &str) -> CsrfResult<()> {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> CsrfResult<()> {
        self.entries.lock().retain(|(n, _)| n != name);
        Ok(())
    }

    async fn count(&self) -> CsrfResult<usize> {
        Ok(self.entries.lock().len())
    }

    async fn oldest_key(&self) -> CsrfResult<Option<String>> {
        Ok(self.entries.lock().first().map(|(n, _)| n.clone()))
    }

    async fn newest_key(&self) -> CsrfResult<Option<String>> {
        Ok(self.entries.lock().last().map(|(n, _)| n.clone()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Session-backed token storage.
///
/// Keeps the ordered pair list in the session data under the namespace key,
/// mutating the shared session in place so the owning store sees every
/// change.
pub struct SessionStorage {
    session: SharedSession,
    key: String,
}

impl SessionStorage {
    pub fn new(session: SharedSession, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }

    fn load(&self, session: &Session) -> Vec<(String, String)> {
        session.get(&self.key).unwrap_or_default()
    }

    fn store(&self, session: &mut Session, entries: Vec<(String, String)>) -> CsrfResult<()> {
        session
            .set(&self.key, entries)
            .map_err(|e| CsrfError::Storage(e.to_string()))
    }
}

#[async_trait]
impl TokenStorage for SessionStorage {
    async fn get(&self, name: &str) -> CsrfResult<Option<String>> {
        let session = self.session.lock();
        Ok(self
            .load(&session)
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v))
    }

    async fn set(&self, name: &str, value: &str) -> CsrfResult<()> {
        let mut session = self.session.lock();
        let mut entries = self.load(&session);
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
        self.store(&mut session, entries)
    }

    async fn remove(&self, name: &str) -> CsrfResult<()> {
        let mut session = self.session.lock();
        let mut entries = self.load(&session);
        entries.retain(|(n, _)| n != name);
        self.store(&mut session, entries)
    }

    async fn count(&self) -> CsrfResult<usize> {
        let session = self.session.lock();
        Ok(self.load(&session).len())
    }

    async fn oldest_key(&self) -> CsrfResult<Option<String>> {
        let session = self.session.lock();
        Ok(self.load(&session).first().map(|(n, _)| n.clone()))
    }

    async fn newest_key(&self) -> CsrfResult<Option<String>> {
        let session = self.session.lock();
        Ok(self.load(&session).last().map(|(n, _)| n.clone()))
    }

    fn backend(&self) -> &'static str {
        "session"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_set_get_remove() {
        let storage = MemoryStorage::new();

        storage.set("n1", "v1").await.unwrap();
        assert_eq!(storage.get("n1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(storage.count().await.unwrap(), 1);

        storage.remove("n1").await.unwrap();
        assert_eq!(storage.get("n1").await.unwrap(), None);
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_remove_is_idempotent() {
        let storage = MemoryStorage::new();
        storage.remove("absent").await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_ordering() {
        let storage = MemoryStorage::new();
        storage.set("n1", "v1").await.unwrap();
        storage.set("n2", "v2").await.unwrap();
        storage.set("n3", "v3").await.unwrap();

        assert_eq!(storage.oldest_key().await.unwrap(), Some("n1".to_string()));
        assert_eq!(storage.newest_key().await.unwrap(), Some("n3".to_string()));
    }

    #[tokio::test]
    async fn test_memory_overwrite_keeps_insertion_order() {
        let storage = MemoryStorage::new();
        storage.set("n1", "v1").await.unwrap();
        storage.set("n2", "v2").await.unwrap();
        storage.set("n1", "v1b").await.unwrap();

        assert_eq!(storage.get("n1").await.unwrap(), Some("v1b".to_string()));
        assert_eq!(storage.oldest_key().await.unwrap(), Some("n1".to_string()));
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    fn test_session() -> SharedSession {
        Arc::new(Mutex::new(Session::new("s1", Duration::from_secs(60))))
    }

    #[tokio::test]
    async fn test_session_storage_round_trip() {
        let session = test_session();
        let storage = SessionStorage::new(session.clone(), "csrf");

        storage.set("n1", "v1").await.unwrap();
        storage.set("n2", "v2").await.unwrap();

        assert_eq!(storage.get("n1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(storage.oldest_key().await.unwrap(), Some("n1".to_string()));
        assert_eq!(storage.newest_key().await.unwrap(), Some("n2".to_string()));
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_session_storage_mutations_visible_in_session() {
        let session = test_session();
        let storage = SessionStorage::new(session.clone(), "csrf");

        storage.set("n1", "v1").await.unwrap();

        // The pair list lives in the session data under the namespace key
        let entries: Option<Vec<(String, String)>> = session.lock().get("csrf");
        assert_eq!(entries, Some(vec![("n1".to_string(), "v1".to_string())]));
    }

    #[tokio::test]
    async fn test_session_storage_namespaces_are_isolated() {
        let session = test_session();
        let a = SessionStorage::new(session.clone(), "a");
        let b = SessionStorage::new(session.clone(), "b");

        a.set("n1", "v1").await.unwrap();

        assert_eq!(a.count().await.unwrap(), 1);
        assert_eq!(b.count().await.unwrap(), 0);
    }
}
