use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    mindfulness::{
        course::{CourseAction, CourseView},
        timer::{Countdown, COMPLETE_MESSAGE, DEFAULT_MINUTES},
    },
    state::AppState,
};

pub fn mindfulness_routes() -> Router<AppState> {
    Router::new()
        .route("/mindfulness/course", get(get_course))
        .route("/mindfulness/course/:action", post(update_course))
        .route("/mindfulness/timer", get(timer))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<CourseView> {
    Json(state.course.load(user_id).await.into())
}

#[instrument(skip(state))]
pub async fn update_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(action): Path<CourseAction>,
) -> AppResult<Json<CourseView>> {
    let progress = state.course.apply(user_id, action).await?;
    Ok(Json(progress.into()))
}

#[derive(Debug, Deserialize)]
pub struct TimerQuery {
    #[serde(default = "default_minutes")]
    pub minutes: u32,
}

fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}

/// `(event, data)` pairs: `start`, one `tick` per period, then `complete`.
/// Dropping the stream stops the countdown.
pub fn countdown_events(countdown: Countdown) -> impl Stream<Item = (&'static str, String)> {
    async_stream::stream! {
        yield ("start", countdown.start_message());
        let mut interval = tokio::time::interval(countdown.period());
        for label in countdown.labels() {
            interval.tick().await;
            yield ("tick", label);
        }
        interval.tick().await;
        yield ("complete", COMPLETE_MESSAGE.to_string());
    }
}

#[instrument(skip(_user))]
pub async fn timer(
    _user: AuthUser,
    Query(q): Query<TimerQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let countdown = Countdown::new(q.minutes)?;
    debug!(minutes = q.minutes, "timer started");
    let events = countdown_events(countdown)
        .map(|(name, data)| Ok(Event::default().event(name).data(data)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
