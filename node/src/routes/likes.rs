use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use storefront_model::ProductId;

#[derive(Debug, Serialize)]
pub struct LikesView {
    pub ids: Vec<ProductId>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub count: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/likes", get(list).delete(clear))
        .route("/likes/refresh", post(refresh))
        .route("/likes/:id/toggle", post(toggle))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<LikesView> {
    Json(LikesView {
        ids: state.likes.ids().await,
    })
}

async fn clear(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.likes.unlike_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ToggleResponse>> {
    let product_id = ProductId(id);
    let liked = state.likes.toggle(product_id).await?;
    Ok(Json(ToggleResponse { product_id, liked }))
}

async fn refresh(State(state): State<Arc<AppState>>) -> ApiResult<Json<RefreshResponse>> {
    let count = state.likes.refresh().await?;
    Ok(Json(RefreshResponse { count }))
}
