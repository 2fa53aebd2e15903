pub mod cart;
pub mod chat;
pub mod health;
pub mod likes;
pub mod reviews;
pub mod search;
pub mod session;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(cart::routes())
        .merge(likes::routes())
        .merge(chat::routes())
        .merge(reviews::routes())
        .merge(search::routes())
        .merge(session::routes())
        .with_state(state)
}
