use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_model::{ProductId, Review, ReviewDraft, ReviewId};

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub product_id: ProductId,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}

/// Review body posted under a product path; the product comes from the path.
#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub author: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub fetched: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reviews", get(all))
        .route("/reviews/:id", delete(remove))
        .route("/reviews/product/:id", get(for_product).post(add))
        .route("/reviews/product/:id/refresh", post(refresh))
}

async fn all(State(state): State<Arc<AppState>>) -> Json<Vec<Review>> {
    Json(state.reviews.all().await)
}

async fn for_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<ProductReviews> {
    let product_id = ProductId(id);
    Json(ProductReviews {
        product_id,
        reviews: state.reviews.for_product(product_id).await,
        average_rating: state.reviews.average_rating(product_id).await,
    })
}

async fn add(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let draft = ReviewDraft {
        product_id: ProductId(id),
        author: body.author,
        rating: body.rating,
        comment: body.comment,
    };
    let review = state.reviews.add(draft).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RefreshResponse>> {
    let fetched = state.reviews.refresh_seed(ProductId(id)).await?;
    Ok(Json(RefreshResponse { fetched }))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if state.reviews.remove(ReviewId(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("review {id}")))
    }
}
