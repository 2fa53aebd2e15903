use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_model::{Product, ProductId};
use storefront_store::{CartEntry, CartPatch};
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub selected_total: u64,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub added: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectAll {
    pub selected: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(view).post(add).delete(clear))
        .route("/cart/select-all", post(select_all))
        .route("/cart/:id", patch(update).delete(remove))
}

async fn view(State(state): State<Arc<AppState>>) -> Json<CartView> {
    Json(CartView {
        entries: state.cart.entries().await,
        selected_total: state.cart.selected_total().await,
    })
}

async fn add(
    State(state): State<Arc<AppState>>,
    Json(product): Json<Product>,
) -> ApiResult<Json<AddResponse>> {
    let id = product.id;
    let added = state.cart.add(product).await?;
    debug!(product = %id, added, "cart add");
    Ok(Json(AddResponse { added }))
}

async fn clear(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.cart.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn select_all(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectAll>,
) -> ApiResult<Json<CartView>> {
    state.cart.set_all_selected(body.selected).await?;
    Ok(view(State(state)).await)
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<CartPatch>,
) -> ApiResult<Json<CartEntry>> {
    let id = ProductId(id);
    state
        .cart
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("cart entry {id}")))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let id = ProductId(id);
    if state.cart.remove(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("cart entry {id}")))
    }
}
