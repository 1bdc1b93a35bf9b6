use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    export::{self, archive::build_archive, pdf::render_pdf},
    journal::{
        dto::{
            BatchResponse, CreateEntryRequest, EmailRequest, EntryView, ExportFormat,
            ExportQuery, ListQuery, Selection,
        },
        services::Journal,
    },
    notify,
    state::AppState,
};

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/metadata", get(download_metadata))
        .route("/entries/archive", get(download_archive))
        .route("/entries/:id/export", get(export_entry))
        .route("/entries/trash", post(trash_entries))
        .route("/entries/email", post(email_entries))
}

pub fn trash_routes() -> Router<AppState> {
    Router::new()
        .route("/trash", get(list_trash))
        .route("/trash/restore", post(restore_entries))
        .route("/trash/delete", post(delete_entries))
}

/// Response that the client saves as `filename`.
fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "'"));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

fn batch(affected: usize, verb: &str) -> Json<BatchResponse> {
    Json(BatchResponse {
        affected,
        message: format!("{} {} entr{}", verb, affected, if affected == 1 { "y" } else { "ies" }),
    })
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Json<Vec<EntryView>> {
    let entries = Journal::new(&state, user_id).list(q.sort).await;
    Json(entries.into_iter().map(EntryView::from).collect())
}

#[instrument(skip(state, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateEntryRequest>,
) -> AppResult<(StatusCode, Json<EntryView>)> {
    let entry = Journal::new(&state, user_id)
        .create(&payload.content, payload.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[instrument(skip(state))]
pub async fn download_metadata(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    let entries = Journal::new(&state, user_id).list_unsorted().await;
    let body = serde_json::to_vec_pretty(&entries)?;
    Ok(attachment("application/json", export::METADATA_FILE_NAME, body))
}

#[instrument(skip(state))]
pub async fn download_archive(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    let entries = Journal::new(&state, user_id).list_unsorted().await;
    // Compression and PDF layout are CPU-bound.
    let body = tokio::task::spawn_blocking(move || build_archive(&entries))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(attachment("application/zip", export::ARCHIVE_FILE_NAME, body))
}

#[instrument(skip(state))]
pub async fn export_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Query(q): Query<ExportQuery>,
) -> AppResult<Response> {
    let entry = Journal::new(&state, user_id).find(id).await?;
    let response = match q.format {
        ExportFormat::Txt => attachment(
            "text/plain; charset=utf-8",
            &export::file_name(&entry.title, "txt"),
            export::render_text(&entry).into_bytes(),
        ),
        ExportFormat::Pdf => attachment(
            "application/pdf",
            &export::file_name(&entry.title, "pdf"),
            render_pdf(&entry)?,
        ),
    };
    Ok(response)
}

#[instrument(skip(state, selection))]
pub async fn trash_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(selection): Json<Selection>,
) -> AppResult<Json<BatchResponse>> {
    let n = Journal::new(&state, user_id).move_to_trash(&selection).await?;
    Ok(batch(n, "Moved to trash:"))
}

#[instrument(skip(state))]
pub async fn list_trash(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<Vec<EntryView>> {
    let entries = Journal::new(&state, user_id).list_trash().await;
    Json(entries.into_iter().map(EntryView::from).collect())
}

#[instrument(skip(state, selection))]
pub async fn restore_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(selection): Json<Selection>,
) -> AppResult<Json<BatchResponse>> {
    let n = Journal::new(&state, user_id).restore(&selection).await?;
    Ok(batch(n, "Restored"))
}

#[instrument(skip(state, selection))]
pub async fn delete_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(selection): Json<Selection>,
) -> AppResult<Json<BatchResponse>> {
    let n = Journal::new(&state, user_id)
        .delete_permanently(&selection)
        .await?;
    Ok(batch(n, "Permanently deleted"))
}

#[instrument(skip(state, payload))]
pub async fn email_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<EmailRequest>,
) -> AppResult<Json<BatchResponse>> {
    let recipient = notify::validate_recipient(&payload.recipient)?;
    let entries = Journal::new(&state, user_id)
        .resolve_any(&payload.selection)
        .await?;
    let n = notify::send_entries(state.mailer.as_ref(), recipient, &entries).await?;
    Ok(batch(n, "Emailed"))
}
