//! Integration tests for parapet-csrf

use parapet_core::{Error, HandlerFn, HttpRequest, HttpResponse, Middleware, MiddlewareChain, Next};
use parapet_csrf::*;
use parapet_session::{MemorySessionStore, SessionMiddleware};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Next handler that counts invocations and echoes the attached token pair
/// as `name:value` in the response body.
fn echo_next(calls: Arc<AtomicUsize>) -> Next {
    Box::new(move |req: HttpRequest| {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let name = req.attribute("csrf_name").cloned().unwrap_or_default();
            let value = req.attribute("csrf_value").cloned().unwrap_or_default();
            Ok(HttpResponse::ok().with_body(format!("{}:{}", name, value).into_bytes()))
        }) as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
    })
}

fn pair_from(response: &HttpResponse) -> (String, String) {
    let body = String::from_utf8(response.body.clone()).unwrap();
    let (name, value) = body.split_once(':').unwrap();
    (name.to_string(), value.to_string())
}

fn get_request() -> HttpRequest {
    HttpRequest::new("GET".to_string(), "/form".to_string())
}

fn post_request(name: &str, value: &str) -> HttpRequest {
    let mut req = HttpRequest::new("POST".to_string(), "/submit".to_string());
    req.body = format!("csrf_name={}&csrf_value={}", name, value).into_bytes();
    req
}

fn memory_guard(config: CsrfConfig) -> (CsrfGuard, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let guard = CsrfGuard::new(config)
        .unwrap()
        .with_storage(storage.clone());
    (guard, storage)
}

#[tokio::test]
async fn test_get_issues_and_attaches_token() {
    let (guard, storage) = memory_guard(CsrfConfig::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();

    let (name, value) = pair_from(&response);
    assert!(name.starts_with("csrf"));
    assert_eq!(value.len(), 32);
    assert_eq!(storage.get(&name).await.unwrap(), Some(value));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_valid_post_reaches_handler_and_rotates() {
    let (guard, storage) = memory_guard(CsrfConfig::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let (name, value) = pair_from(&response);

    let response = guard
        .handle(post_request(&name, &value), echo_next(calls.clone()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The submitted pair was consumed and a fresh one attached
    let (new_name, _) = pair_from(&response);
    assert_ne!(new_name, name);
    assert_eq!(storage.get(&name).await.unwrap(), None);
    assert_eq!(storage.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_replayed_pair_is_rejected() {
    let (guard, _storage) = memory_guard(CsrfConfig::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let (name, value) = pair_from(&response);

    let first = guard
        .handle(post_request(&name, &value), echo_next(calls.clone()))
        .await
        .unwrap();
    assert_eq!(first.status, 200);

    let replay = guard
        .handle(post_request(&name, &value), echo_next(calls.clone()))
        .await
        .unwrap();
    assert_eq!(replay.status, 400);
    assert_eq!(replay.body, b"Failed CSRF check!");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_post_without_fields_hits_failure_handler() {
    let (guard, _storage) = memory_guard(CsrfConfig::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let req = HttpRequest::new("POST".to_string(), "/submit".to_string());
    let response = guard.handle(req, echo_next(calls.clone())).await.unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(
        response.headers.get("Content-Type"),
        Some(&"text/plain".to_string())
    );
    assert_eq!(response.body, b"Failed CSRF check!");
    // The wrapped handler is never invoked on failure
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tampered_value_rejected_and_consumed() {
    let (guard, storage) = memory_guard(CsrfConfig::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let (name, _value) = pair_from(&response);

    let response = guard
        .handle(
            post_request(&name, "0000000000000000"),
            echo_next(calls.clone()),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // The candidate name was retired even though validation failed
    assert_eq!(storage.get(&name).await.unwrap(), None);
}

#[tokio::test]
async fn test_storage_limit_keeps_newest_pairs() {
    let (guard, storage) = memory_guard(CsrfConfig::new().with_storage_limit(2));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut names = Vec::new();
    for _ in 0..3 {
        let response = guard
            .handle(get_request(), echo_next(calls.clone()))
            .await
            .unwrap();
        names.push(pair_from(&response).0);
    }

    assert_eq!(storage.count().await.unwrap(), 2);
    assert_eq!(storage.get(&names[0]).await.unwrap(), None);
    assert!(storage.get(&names[1]).await.unwrap().is_some());
    assert!(storage.get(&names[2]).await.unwrap().is_some());
}

#[tokio::test]
async fn test_persistent_mode_reuses_pair() {
    let (guard, storage) =
        memory_guard(CsrfConfig::new().with_persistent_tokens(true));
    let calls = Arc::new(AtomicUsize::new(0));

    let first = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let second = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();

    assert_eq!(pair_from(&first), pair_from(&second));
    assert_eq!(storage.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_persistent_pair_survives_valid_posts() {
    let (guard, _storage) =
        memory_guard(CsrfConfig::new().with_persistent_tokens(true));
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let (name, value) = pair_from(&response);

    for _ in 0..3 {
        let response = guard
            .handle(post_request(&name, &value), echo_next(calls.clone()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        // The same pair stays current after each successful submit
        assert_eq!(pair_from(&response), (name.clone(), value.clone()));
    }
}

#[tokio::test]
async fn test_persistent_mode_rotates_after_failure() {
    let (guard, _storage) =
        memory_guard(CsrfConfig::new().with_persistent_tokens(true));
    let calls = Arc::new(AtomicUsize::new(0));

    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    let original = pair_from(&response);

    let response = guard
        .handle(
            post_request("bogus", "bogus"),
            echo_next(calls.clone()),
        )
        .await
        .unwrap();
    assert_eq!(response.status, 400);

    // The failed check minted a replacement; the session now exposes it
    let response = guard
        .handle(get_request(), echo_next(calls.clone()))
        .await
        .unwrap();
    assert_ne!(pair_from(&response), original);
}

#[tokio::test]
async fn test_custom_failure_handler() {
    let (mut guard, _storage) = memory_guard(CsrfConfig::new());
    guard.set_failure_handler(Arc::new(|_req, _next| {
        Box::pin(async {
            Ok(HttpResponse::new(418).with_body(b"teapot".to_vec()))
        })
    }));

    let calls = Arc::new(AtomicUsize::new(0));
    let req = HttpRequest::new("POST".to_string(), "/submit".to_string());
    let response = guard.handle(req, echo_next(calls.clone())).await.unwrap();

    assert_eq!(response.status, 418);
    assert_eq!(response.body, b"teapot");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_session_is_fatal() {
    let guard = CsrfGuard::new(CsrfConfig::new()).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = guard.handle(get_request(), echo_next(calls.clone())).await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_weak_strength_rejected_at_construction() {
    let result = CsrfGuard::new(CsrfConfig::new().with_strength(8));
    assert!(matches!(result, Err(CsrfError::Configuration(_))));
}

/// Full pipeline: session middleware resolves the session, the guard keeps
/// its token map inside it, and the handler renders the current pair.
#[tokio::test]
async fn test_session_backed_pipeline() {
    let mut chain = MiddlewareChain::new();
    chain.use_middleware(SessionMiddleware::new(Arc::new(MemorySessionStore::new())));
    chain.use_middleware(CsrfGuard::new(CsrfConfig::new()).unwrap());

    let handler: HandlerFn = Arc::new(|req: HttpRequest| {
        let name = req.attribute("csrf_name").cloned().unwrap_or_default();
        let value = req.attribute("csrf_value").cloned().unwrap_or_default();
        Box::pin(async move {
            Ok(HttpResponse::ok().with_body(format!("{}:{}", name, value).into_bytes()))
        }) as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
    });

    // First request starts a session and issues a token
    let response = chain.apply(get_request(), handler.clone()).await.unwrap();
    let cookie = response.headers.get("Set-Cookie").unwrap().clone();
    let session_cookie = cookie.split(';').next().unwrap().to_string();
    let (name, value) = pair_from(&response);

    // Echo the pair back under the same session
    let mut req = post_request(&name, &value);
    req.headers.insert("Cookie".to_string(), session_cookie.clone());
    let response = chain.apply(req, handler.clone()).await.unwrap();

    assert_eq!(response.status, 200);
    let (new_name, _) = pair_from(&response);
    assert_ne!(new_name, name);

    // Replaying the consumed pair under the same session fails
    let mut req = post_request(&name, &value);
    req.headers.insert("Cookie".to_string(), session_cookie);
    let response = chain.apply(req, handler).await.unwrap();
    assert_eq!(response.status, 400);
}

/// Tokens belong to the session that issued them: a pair from one session
/// does not validate in another.
#[tokio::test]
async fn test_tokens_are_scoped_to_their_session() {
    let mut chain = MiddlewareChain::new();
    chain.use_middleware(SessionMiddleware::new(Arc::new(MemorySessionStore::new())));
    chain.use_middleware(CsrfGuard::new(CsrfConfig::new()).unwrap());

    let handler: HandlerFn = Arc::new(|req: HttpRequest| {
        let name = req.attribute("csrf_name").cloned().unwrap_or_default();
        let value = req.attribute("csrf_value").cloned().unwrap_or_default();
        Box::pin(async move {
            Ok(HttpResponse::ok().with_body(format!("{}:{}", name, value).into_bytes()))
        }) as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
    });

    let response = chain.apply(get_request(), handler.clone()).await.unwrap();
    let (name, value) = pair_from(&response);

    // No cookie: the POST runs in a brand-new session
    let response = chain
        .apply(post_request(&name, &value), handler)
        .await
        .unwrap();
    assert_eq!(response.status, 400);
}
