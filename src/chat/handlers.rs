use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    chat::{
        dto::{ChatRequest, ChatResponse, ChatTurn},
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/history", get(get_history).delete(clear_history))
}

#[instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let (reply, score) = services::ask(
        state.model.as_ref(),
        state.tagger.as_ref(),
        &state.chat_history,
        user_id,
        &payload.prompt,
    )
    .await?;
    Ok(Json(ChatResponse {
        reply,
        sentiment: score.label.to_string(),
    }))
}

#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<Vec<ChatTurn>> {
    Json(state.chat_history.load(user_id).await)
}

#[instrument(skip(state))]
pub async fn clear_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    state.chat_history.clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
