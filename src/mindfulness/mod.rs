use crate::state::AppState;
use axum::Router;

pub mod course;
pub mod handlers;
pub mod timer;

pub fn router() -> Router<AppState> {
    handlers::mindfulness_routes()
}
