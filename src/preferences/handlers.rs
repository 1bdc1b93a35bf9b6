use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    preferences::{Palette, Preferences},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    #[serde(flatten)]
    pub preferences: Preferences,
    pub palette: Palette,
}

impl From<Preferences> for PreferencesResponse {
    fn from(preferences: Preferences) -> Self {
        let palette = preferences.theme.palette();
        Self {
            preferences,
            palette,
        }
    }
}

pub fn preference_routes() -> Router<AppState> {
    Router::new().route("/preferences", get(get_preferences).put(put_preferences))
}

#[instrument(skip(state))]
pub async fn get_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<PreferencesResponse> {
    Json(state.preferences.load(user_id).await.into())
}

#[instrument(skip(state))]
pub async fn put_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<Preferences>,
) -> AppResult<Json<PreferencesResponse>> {
    state.preferences.save(user_id, &payload).await?;
    Ok(Json(payload.into()))
}
