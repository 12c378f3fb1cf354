//! The CSRF guard middleware.

use crate::config::CsrfConfig;
use crate::error::{CsrfError, CsrfResult};
use crate::eviction::enforce_limit;
use crate::storage::{SessionStorage, TokenStorage};
use crate::token::{constant_time_eq, create_name, create_value, TokenPair};
use async_trait::async_trait;
use parapet_core::{form, Error, HttpRequest, HttpResponse, Middleware, Next};
use parapet_session::Session;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// State-changing methods that must carry a valid token.
const PROTECTED_METHODS: [&str; 4] = ["POST", "PUT", "DELETE", "PATCH"];

/// Handler invoked when token validation fails.
///
/// Receives the request (already carrying a freshly rotated token pair in
/// its attributes) and the next handler, and produces the failure response.
/// The default implementation never invokes the next handler.
pub type FailureHandler = Arc<
    dyn Fn(HttpRequest, Next) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send
        + Sync,
>;

fn default_failure_handler() -> FailureHandler {
    Arc::new(|_req, _next| {
        Box::pin(async {
            Ok(HttpResponse::bad_request()
                .with_header("Content-Type".to_string(), "text/plain".to_string())
                .with_body(b"Failed CSRF check!".to_vec()))
        })
    })
}

/// CSRF token lifecycle middleware.
///
/// Per request: resolves the token storage, verifies the submitted token on
/// state-changing methods, mints or reloads the current pair, trims storage
/// to its limit, and attaches the pair to the request attributes for
/// downstream rendering.
pub struct CsrfGuard {
    config: CsrfConfig,
    storage: Option<Arc<dyn TokenStorage>>,
    failure_handler: FailureHandler,
}

impl CsrfGuard {
    /// Create a new guard. Fails if the configuration is invalid.
    pub fn new(config: CsrfConfig) -> CsrfResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            storage: None,
            failure_handler: default_failure_handler(),
        })
    }

    /// Use an explicit token storage instead of the request session.
    pub fn with_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the failure handler. Takes effect on the next invocation.
    pub fn set_failure_handler(&mut self, handler: FailureHandler) {
        self.failure_handler = handler;
    }

    /// Toggle persistent token mode. Takes effect on the next invocation.
    pub fn set_persistent_tokens(&mut self, persistent: bool) {
        self.config.persistent_tokens = persistent;
    }

    /// Change the storage limit. Takes effect on the next invocation.
    pub fn set_storage_limit(&mut self, limit: i64) {
        self.config.storage_limit = limit;
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Attribute/form-field key carrying the token name.
    pub fn token_name_key(&self) -> String {
        self.config.token_name_key()
    }

    /// Attribute/form-field key carrying the token value.
    pub fn token_value_key(&self) -> String {
        self.config.token_value_key()
    }

    /// The token name attached to this request, if one was issued this cycle.
    pub fn token_name<'r>(&self, request: &'r HttpRequest) -> Option<&'r str> {
        request
            .attributes
            .get(&self.token_name_key())
            .map(String::as_str)
    }

    /// The token value attached to this request, if one was issued this cycle.
    pub fn token_value<'r>(&self, request: &'r HttpRequest) -> Option<&'r str> {
        request
            .attributes
            .get(&self.token_value_key())
            .map(String::as_str)
    }

    /// Resolve the storage collection for this request.
    ///
    /// An explicit storage wins; otherwise the request must carry a session
    /// handle, and the token map lives inside it under the prefix key.
    fn resolve_storage(&self, request: &HttpRequest) -> CsrfResult<Arc<dyn TokenStorage>> {
        if let Some(storage) = &self.storage {
            return Ok(Arc::clone(storage));
        }

        let session = request
            .extensions
            .get_arc::<Mutex<Session>>()
            .ok_or(CsrfError::SessionUnavailable)?;
        Ok(Arc::new(SessionStorage::new(
            session,
            self.config.prefix.clone(),
        )))
    }

    /// Mint a new token pair and store it.
    pub async fn generate_token(&self, storage: &dyn TokenStorage) -> CsrfResult<TokenPair> {
        let name = create_name(&self.config.prefix);
        let value = create_value(self.config.strength)?;
        storage.set(&name, &value).await?;
        trace!(name = %name, backend = storage.backend(), "token pair minted");
        Ok(TokenPair::new(name, value))
    }

    /// Check a submitted token pair against storage.
    ///
    /// In non-persistent mode the entry for `name` is retired whether or not
    /// the comparison succeeds, so a candidate can never be replayed.
    pub async fn validate_token(
        &self,
        storage: &dyn TokenStorage,
        name: &str,
        value: &str,
    ) -> CsrfResult<bool> {
        let stored = storage.get(name).await?;

        if !self.config.persistent_tokens {
            storage.remove(name).await?;
        }

        Ok(match stored {
            Some(stored) => constant_time_eq(&stored, value),
            None => false,
        })
    }

    /// Pick the pair to expose this cycle.
    ///
    /// Non-persistent mode always mints; persistent mode reuses the latest
    /// stored pair and only mints when the storage is empty.
    async fn issue(&self, storage: &dyn TokenStorage) -> CsrfResult<TokenPair> {
        if self.config.persistent_tokens {
            if let Some(pair) = self.load_newest_pair(storage).await? {
                trace!(name = %pair.name, "persistent token reused");
                return Ok(pair);
            }
        }
        self.generate_token(storage).await
    }

    async fn load_newest_pair(&self, storage: &dyn TokenStorage) -> CsrfResult<Option<TokenPair>> {
        let Some(name) = storage.newest_key().await? else {
            return Ok(None);
        };
        Ok(storage
            .get(&name)
            .await?
            .map(|value| TokenPair::new(name, value)))
    }

    /// Pull the submitted pair out of the parsed request body.
    fn extract_submitted(&self, request: &HttpRequest) -> Option<(String, String)> {
        let name_key = self.token_name_key();
        let value_key = self.token_value_key();

        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&request.body) {
            let name = json.get(name_key.as_str()).and_then(|v| v.as_str());
            let value = json.get(value_key.as_str()).and_then(|v| v.as_str());
            if let (Some(name), Some(value)) = (name, value) {
                return Some((name.to_string(), value.to_string()));
            }
        }

        if let Ok(fields) = form::parse_form_map(&request.body) {
            if let (Some(name), Some(value)) = (fields.get(&name_key), fields.get(&value_key)) {
                return Some((name.clone(), value.clone()));
            }
        }

        None
    }

    fn attach(&self, request: &mut HttpRequest, pair: &TokenPair) {
        request
            .attributes
            .insert(self.token_name_key(), pair.name.clone());
        request
            .attributes
            .insert(self.token_value_key(), pair.value.clone());
    }
}

#[async_trait]
impl Middleware for CsrfGuard {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let storage = self.resolve_storage(&req)?;

        if PROTECTED_METHODS.contains(&req.method.as_str()) {
            let submitted = self.extract_submitted(&req);
            let valid = match &submitted {
                Some((name, value)) => {
                    self.validate_token(storage.as_ref(), name, value).await?
                }
                None => false,
            };

            if !valid {
                warn!(
                    method = %req.method,
                    path = %req.path,
                    submitted = submitted.is_some(),
                    "CSRF validation failed"
                );
                // A failed check always rotates, in every mode
                let pair = self.generate_token(storage.as_ref()).await?;
                self.attach(&mut req, &pair);
                return (self.failure_handler)(req, next).await;
            }
        }

        let pair = self.issue(storage.as_ref()).await?;
        self.attach(&mut req, &pair);

        let evicted = enforce_limit(storage.as_ref(), self.config.storage_limit).await?;
        if evicted > 0 {
            debug!(evicted, "surplus token pairs evicted");
        }

        next(req).await
    }
}
