use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::CurrentUser,
        jwt::{JwtKeys, TokenKind},
        repo_types::User,
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user_id: Uuid, username: String) -> AppResult<AuthResponse> {
    let pair = JwtKeys::from_ref(state).issue(user_id)?;
    Ok(AuthResponse {
        access_token: pair.access,
        refresh_token: pair.refresh,
        user: PublicUser {
            id: user_id,
            username,
        },
    })
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let User { id, username, .. } = services::register(
        &state.users,
        &payload.username,
        &payload.password,
        &payload.confirm_password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, id, username)?)))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let User { id, username, .. } =
        services::authenticate(&state.users, &payload.username, &payload.password).await?;
    Ok(Json(issue_tokens(&state, id, username)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let claims = JwtKeys::from_ref(&state).verify(&payload.refresh_token, TokenKind::Refresh)?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(issue_tokens(&state, user.id, user.username)?))
}

/// Current user. A token for an account that no longer exists is refused
/// by the extractor.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.id,
        username: user.username,
    })
}
