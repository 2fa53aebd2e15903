use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub queries: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    pub query: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search-history", get(recent).post(record).delete(remove))
}

async fn recent(State(state): State<Arc<AppState>>) -> Json<HistoryView> {
    Json(HistoryView {
        queries: state.search_history.recent().await,
    })
}

async fn record(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecordQuery>,
) -> ApiResult<Json<HistoryView>> {
    state.search_history.record(&body.query).await?;
    Ok(recent(State(state)).await)
}

/// `?query=` drops a single entry; without it the whole history goes.
async fn remove(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RemoveParams>,
) -> ApiResult<StatusCode> {
    match params.query {
        Some(query) => {
            state.search_history.remove(&query).await?;
        }
        None => state.search_history.clear().await?,
    }
    Ok(StatusCode::NO_CONTENT)
}
