use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;
use storefront_contracts::{app_with_remotes, call};
use storefront_model::ProductId;
use storefront_node::Remotes;
use storefront_store::{KvStore, LikesRemote, Result, StoreError};

struct OfflineApi;

#[async_trait]
impl LikesRemote for OfflineApi {
    async fn fetch_likes(&self) -> Result<Vec<ProductId>> {
        Err(StoreError::Remote("connection refused".to_string()))
    }

    async fn set_like(&self, _product: ProductId, _liked: bool) -> Result<()> {
        Err(StoreError::Remote("connection refused".to_string()))
    }
}

#[tokio::test]
async fn rejected_like_is_reverted_and_reported_as_bad_gateway() {
    let remotes = Remotes {
        likes: Some(Arc::new(OfflineApi)),
        reviews: None,
    };
    let (app, state, kv) = app_with_remotes(remotes).await;

    let (status, body) = call(&app, Method::POST, "/likes/8/toggle", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));

    assert!(!state.likes.is_liked(ProductId(8)).await);
    let stored = kv.get("likes").await.unwrap().unwrap_or_else(|| "[]".to_string());
    assert_eq!(serde_json::from_str::<Vec<i64>>(&stored).unwrap(), Vec::<i64>::new());

    let (status, _) = call(&app, Method::POST, "/likes/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
