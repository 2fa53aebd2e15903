use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use storefront_model::{ChatMessage, MessageId, SellerId};
use storefront_store::ConversationSummary;

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub text: String,
    /// Record the message as received from the seller instead of sent.
    #[serde(default)]
    pub from_counterparty: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", get(conversations))
        .route("/chat/messages/:id", delete(remove_message))
        .route(
            "/chat/:counterparty",
            get(thread).post(post_message).delete(clear_thread),
        )
}

async fn conversations(State(state): State<Arc<AppState>>) -> Json<Vec<ConversationSummary>> {
    Json(state.chat.conversations().await)
}

async fn thread(
    State(state): State<Arc<AppState>>,
    Path(counterparty): Path<i64>,
) -> Json<Vec<ChatMessage>> {
    Json(state.chat.thread(SellerId(counterparty)).await)
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(counterparty): Path<i64>,
    Json(body): Json<PostMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let counterparty = SellerId(counterparty);
    let message = if body.from_counterparty {
        state.chat.receive(counterparty, &body.text).await?
    } else {
        state.chat.send(counterparty, &body.text).await?
    };
    Ok((StatusCode::CREATED, Json(message)))
}

async fn clear_thread(
    State(state): State<Arc<AppState>>,
    Path(counterparty): Path<i64>,
) -> ApiResult<StatusCode> {
    let counterparty = SellerId(counterparty);
    if state.chat.clear_thread(counterparty).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("conversation with {counterparty}")))
    }
}

async fn remove_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    if state.chat.remove_message(MessageId(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("message {id}")))
    }
}
