use crate::config::StorageBackend;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Liveness plus a summary of what the node is holding.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: &'static str,
    build_id: String,
    storage: &'static str,
    encrypted: bool,
    remote: bool,
    collections: CollectionCounts,
}

#[derive(Debug, Serialize)]
struct CollectionCounts {
    cart: usize,
    likes: usize,
    conversations: usize,
    reviews: usize,
    searches: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(report))
}

async fn report(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let config = state.config();
    let storage = match config.storage {
        StorageBackend::Sled => "sled",
        StorageBackend::Memory => "memory",
    };

    Json(HealthReport {
        status: "ok",
        build_id: state.build_id().to_string(),
        storage,
        encrypted: config.storage_passphrase.is_some(),
        remote: config.api_url.is_some(),
        collections: CollectionCounts {
            cart: state.cart.len().await,
            likes: state.likes.ids().await.len(),
            conversations: state.chat.conversations().await.len(),
            reviews: state.reviews.all().await.len(),
            searches: state.search_history.recent().await.len(),
        },
    })
}
