// Parapet - CSRF protection middleware for Rust
//
// This library wires a synchronizer-token CSRF guard into a small
// middleware pipeline: parapet-core carries the HTTP types and middleware
// contract, parapet-session resolves per-client sessions, and parapet-csrf
// runs the token lifecycle (issue, validate, rotate, evict).

// Re-export core functionality
pub use parapet_core::*;

// Re-export the session and CSRF layers
pub use parapet_csrf;
pub use parapet_session;
