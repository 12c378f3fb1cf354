//! # Parapet CSRF Protection
//!
//! Cross-Site Request Forgery (CSRF) protection middleware built on the
//! synchronizer token pattern: every request is issued a `(name, value)`
//! token pair, state-changing requests must echo the pair back, and the
//! retained pairs live in a bounded, FIFO-evicted storage collection.
//!
//! ## Features
//!
//! - **Token pairs** - unique name plus cryptographically random value
//! - **One-shot or persistent tokens** - rotate every request, or keep one
//!   token per session until a validation failure forces rotation
//! - **Pluggable storage** - in-memory map or session-backed, via the
//!   [`TokenStorage`] trait
//! - **Bounded storage** - FIFO eviction keeps unredeemed tokens from
//!   growing without bound
//! - **Pluggable failure handling** - inject a [`FailureHandler`], or use
//!   the plain-text 400 default
//!
//! ## Quick Start
//!
//! ```rust
//! use parapet_csrf::{CsrfConfig, CsrfGuard, MemoryStorage};
//! use std::sync::Arc;
//!
//! let config = CsrfConfig::new()
//!     .with_prefix("csrf")
//!     .with_storage_limit(100);
//!
//! let guard = CsrfGuard::new(config)
//!     .unwrap()
//!     .with_storage(Arc::new(MemoryStorage::new()));
//!
//! assert_eq!(guard.token_name_key(), "csrf_name");
//! assert_eq!(guard.token_value_key(), "csrf_value");
//! ```
//!
//! ## Token lifecycle
//!
//! ```rust
//! use parapet_csrf::{CsrfConfig, CsrfGuard, MemoryStorage};
//!
//! tokio_test::block_on(async {
//!     let guard = CsrfGuard::new(CsrfConfig::new()).unwrap();
//!     let storage = MemoryStorage::new();
//!
//!     let pair = guard.generate_token(&storage).await.unwrap();
//!     assert!(guard
//!         .validate_token(&storage, &pair.name, &pair.value)
//!         .await
//!         .unwrap());
//!
//!     // One-shot consumption: the same pair never validates twice
//!     assert!(!guard
//!         .validate_token(&storage, &pair.name, &pair.value)
//!         .await
//!         .unwrap());
//! });
//! ```
//!
//! ## Usage in a pipeline
//!
//! ```ignore
//! use parapet_core::MiddlewareChain;
//! use parapet_csrf::{CsrfConfig, CsrfGuard};
//! use parapet_session::{MemorySessionStore, SessionMiddleware};
//! use std::sync::Arc;
//!
//! let mut chain = MiddlewareChain::new();
//! chain.use_middleware(SessionMiddleware::new(Arc::new(MemorySessionStore::new())));
//! chain.use_middleware(CsrfGuard::new(CsrfConfig::new())?);
//!
//! // Handlers read the current pair from the request attributes under
//! // "csrf_name" / "csrf_value" and render it into forms; POSTed forms
//! // echo the same two fields back.
//! ```

pub mod config;
pub mod error;
pub mod eviction;
pub mod middleware;
pub mod storage;
pub mod token;

pub use config::{CsrfConfig, DEFAULT_STORAGE_LIMIT, MIN_STRENGTH};
pub use error::{CsrfError, CsrfResult};
pub use eviction::enforce_limit;
pub use middleware::{CsrfGuard, FailureHandler};
pub use storage::{MemoryStorage, SessionStorage, TokenStorage};
pub use token::TokenPair;
