use crate::error::ApiResult;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/session/logout", post(logout))
}

async fn logout(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}
