//! Core HTTP types and middleware contract for Parapet.
//!
//! This crate carries the request/response wrappers, the typed extensions
//! container, form-body parsing, and the middleware chain that the other
//! Parapet crates build on. It deliberately stays transport-agnostic: a
//! server integration constructs an [`HttpRequest`], runs it through a
//! [`MiddlewareChain`], and writes the resulting [`HttpResponse`] back out.
//!
//! # Example
//!
//! ```rust
//! use parapet_core::{Error, HttpRequest, HttpResponse, MiddlewareChain};
//! use std::future::Future;
//! use std::pin::Pin;
//! use std::sync::Arc;
//!
//! let chain = MiddlewareChain::new();
//! let handler = Arc::new(|_req: HttpRequest| {
//!     Box::pin(async { Ok(HttpResponse::ok()) })
//!         as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
//! });
//!
//! let req = HttpRequest::new("GET".to_string(), "/".to_string());
//! let response = tokio_test::block_on(chain.apply(req, handler)).unwrap();
//! assert_eq!(response.status, 200);
//! ```

pub mod error;
pub mod extensions;
pub mod form;
pub mod http;
pub mod middleware;

pub use error::Error;
pub use extensions::Extensions;
pub use http::{HttpRequest, HttpResponse};
pub use middleware::{HandlerFn, Middleware, MiddlewareChain, Next};
