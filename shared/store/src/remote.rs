//! Seams to the remote REST API that some collections mirror.

use async_trait::async_trait;
use storefront_model::{ProductId, Review};

use crate::Result;

#[async_trait]
pub trait LikesRemote: Send + Sync {
    /// Product ids the signed-in user has liked on the server.
    async fn fetch_likes(&self) -> Result<Vec<ProductId>>;

    /// Record a like (or its removal) on the server.
    async fn set_like(&self, product: ProductId, liked: bool) -> Result<()>;
}

#[async_trait]
pub trait ReviewsRemote: Send + Sync {
    async fn fetch_reviews(&self, product: ProductId) -> Result<Vec<Review>>;

    async fn submit_review(&self, review: &Review) -> Result<()>;
}
