//! Session resolution middleware.
//!
//! Resolves the client's session from a cookie, creating one when absent,
//! and attaches the [`SharedSession`] handle to the request extensions for
//! downstream middleware (e.g. the CSRF guard) and handlers.

use crate::session::Session;
use crate::store::SessionStore;
use async_trait::async_trait;
use parapet_core::{Error, HttpRequest, HttpResponse, Middleware, Next};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "parapet_session";

/// Middleware that attaches a session handle to every request.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
}

impl SessionMiddleware {
    /// Create new session middleware backed by the given store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Extract the session ID from the request's Cookie header.
    fn session_id_from(&self, request: &HttpRequest) -> Option<String> {
        let cookies = request.header("Cookie")?;
        cookies.split(';').find_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            (name == self.cookie_name).then(|| value.to_string())
        })
    }
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let existing = match self.session_id_from(&req) {
            Some(id) => self
                .store
                .get(&id)
                .await
                .map_err(|e| Error::Internal(e.to_string()))?,
            None => None,
        };

        let (session, fresh) = match existing {
            Some(session) => {
                trace!(session_id = %session.lock().id, "existing session resolved");
                (session, false)
            }
            None => {
                let session = self
                    .store
                    .create(None)
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))?;
                debug!(session_id = %session.lock().id, "new session started");
                (session, true)
            }
        };

        let id = session.lock().id.clone();
        req.extensions.insert_arc::<parking_lot::Mutex<Session>>(session);

        let mut response = next(req).await?;

        if fresh {
            response.headers.insert(
                "Set-Cookie".to_string(),
                format!("{}={}; Path=/; HttpOnly", self.cookie_name, id),
            );
        }

        Ok(response)
    }
}
