//! Session storage for the Parapet toolkit.
//!
//! Provides the per-client [`Session`] state object, a [`SessionStore`]
//! trait with an in-memory backend, and [`SessionMiddleware`] that resolves
//! the session from a cookie and attaches a [`SharedSession`] handle to the
//! request extensions.
//!
//! The CSRF guard in `parapet-csrf` consumes that handle when no explicit
//! token storage was configured, keeping its token map inside the session.
//!
//! # Examples
//!
//! ```rust
//! use parapet_session::{MemorySessionStore, SessionStore};
//! use std::time::Duration;
//!
//! tokio_test::block_on(async {
//!     let store = MemorySessionStore::new().with_default_ttl(Duration::from_secs(3600));
//!
//!     let session = store.create(None).await.unwrap();
//!     session.lock().set("user_id", 123).unwrap();
//!
//!     let id = session.lock().id.clone();
//!     let loaded = store.get(&id).await.unwrap().unwrap();
//!     let user_id: Option<i32> = loaded.lock().get("user_id");
//!     assert_eq!(user_id, Some(123));
//! });
//! ```

pub mod error;
pub mod middleware;
pub mod session;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use middleware::{SessionMiddleware, DEFAULT_COOKIE_NAME};
pub use session::{generate_session_id, Session, SharedSession};
pub use store::{MemorySessionStore, SessionStore, DEFAULT_SESSION_TTL};
