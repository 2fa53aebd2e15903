use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storefront_contracts::{app, app_with_backend, call};
use storefront_model::ProductId;
use storefront_node::Remotes;
use storefront_store::{KvStore, MemoryKv, Result, StoreError};

/// Backend that rejects exactly one write, counted from 1.
struct FailingNthWrite {
    inner: MemoryKv,
    writes: AtomicUsize,
    fail_on: usize,
}

impl FailingNthWrite {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: MemoryKv::new(),
            writes: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl KvStore for FailingNthWrite {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(StoreError::Backend(format!("write to `{key}` rejected")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn cart_scenario_over_http() {
    let (app, state, _kv) = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/cart",
        Some(json!({ "id": 1, "name": "Kayak", "price": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], true);
    assert!(state.cart.contains(ProductId(1)).await);

    let (status, entry) = call(&app, Method::PATCH, "/cart/1", Some(json!({ "duration": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["duration"], 3);
    assert_eq!(entry["selected"], true);

    let (_, view) = call(&app, Method::GET, "/cart", None).await;
    assert_eq!(view["selected_total"], 3000);

    let (status, _) = call(&app, Method::DELETE, "/cart/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, view) = call(&app, Method::GET, "/cart", None).await;
    assert_eq!(view["entries"], json!([]));
    assert!(!state.cart.contains(ProductId(1)).await);
}

#[tokio::test]
async fn duplicate_add_reports_not_added() {
    let (app, _state, _kv) = app().await;
    let product = json!({ "id": 4, "name": "Bike", "price": 250 });

    call(&app, Method::POST, "/cart", Some(product.clone())).await;
    let (status, body) = call(&app, Method::POST, "/cart", Some(product)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "added": false }));
    let (_, view) = call(&app, Method::GET, "/cart", None).await;
    assert_eq!(view["entries"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn non_positive_duration_is_stored_as_one() {
    let (app, _state, kv) = app().await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 2, "name": "Tent", "price": 80 }))).await;

    let (status, entry) = call(&app, Method::PATCH, "/cart/2", Some(json!({ "duration": -4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["duration"], 1);

    let raw = kv.get("cart").await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored[0]["duration"], 1);
}

#[tokio::test]
async fn unknown_entries_are_not_found() {
    let (app, _state, _kv) = app().await;

    let (status, body) = call(&app, Method::PATCH, "/cart/9", Some(json!({ "selected": false }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("cart entry 9"));

    let (status, _) = call(&app, Method::DELETE, "/cart/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_write_rolls_back_and_reports_500() {
    let (app, state, kv) = app().await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 1, "name": "Kayak", "price": 1000 }))).await;
    let before = state.cart.entries().await;

    kv.fail_writes(true);
    let (status, body) = call(&app, Method::POST, "/cart", Some(json!({ "id": 2, "name": "Oar", "price": 30 }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::POST, "/cart/select-all", Some(json!({ "selected": false }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(state.cart.entries().await, before);
    kv.fail_writes(false);
}

#[tokio::test]
async fn select_all_updates_total() {
    let (app, _state, _kv) = app().await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 1, "name": "Kayak", "price": 1000 }))).await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 2, "name": "Oar", "price": 30 }))).await;

    let (_, view) = call(&app, Method::POST, "/cart/select-all", Some(json!({ "selected": false }))).await;
    assert_eq!(view["selected_total"], 0);

    let (_, view) = call(&app, Method::POST, "/cart/select-all", Some(json!({ "selected": true }))).await;
    assert_eq!(view["selected_total"], 1030);
}

#[tokio::test]
async fn patch_with_both_fields_is_all_or_nothing() {
    let kv = Arc::new(FailingNthWrite::new(2));
    let (app, state) = app_with_backend(kv.clone(), Remotes::default()).await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 1, "name": "Kayak", "price": 1000 }))).await;

    let patch = json!({ "selected": false, "duration": 3 });
    let (status, _) = call(&app, Method::PATCH, "/cart/1", Some(patch.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let entry = &state.cart.entries().await[0];
    assert!(entry.selected);
    assert_eq!(entry.duration, 1);
    let stored = kv.get("cart").await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored[0]["selected"], true);
    assert_eq!(stored[0]["duration"], 1);

    let (status, entry) = call(&app, Method::PATCH, "/cart/1", Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["selected"], false);
    assert_eq!(entry["duration"], 3);
}
