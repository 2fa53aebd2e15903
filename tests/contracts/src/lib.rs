//! Helpers for driving the node router in-process.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use storefront_node::{router, AppConfig, AppState, Remotes};
use storefront_store::{KvStore, MemoryKv};
use tower::ServiceExt;

/// A router over a fresh in-memory backend. The backend handle is returned
/// so tests can inspect persisted state or inject write failures.
pub async fn app() -> (Router, Arc<AppState>, MemoryKv) {
    app_with_remotes(Remotes::default()).await
}

pub async fn app_with_remotes(remotes: Remotes) -> (Router, Arc<AppState>, MemoryKv) {
    let kv = MemoryKv::new();
    let (app, state) = app_with_backend(Arc::new(kv.clone()), remotes).await;
    (app, state, kv)
}

/// A router over any backend, for tests that need custom failure behaviour.
pub async fn app_with_backend(kv: Arc<dyn KvStore>, remotes: Remotes) -> (Router, Arc<AppState>) {
    let state = AppState::with_backend(AppConfig::ephemeral(), kv, remotes).await;
    (router(Arc::clone(&state)), state)
}

/// Send one request and decode the JSON body, `Value::Null` when empty.
pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}
