//! Operational endpoints: manual ingestion, source management, settings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    IngestRunResponse, SettingDto, SettingUpdateRequest, SourceStatusDto, SourceUpsertRequest,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LensError};
use crate::persistence::LogStore;

/// `POST /ingest/run` — Trigger one ingestion cycle immediately.
///
/// Runs the same pipeline the background scheduler runs; a concurrent
/// scheduled cycle is harmless because storage is idempotent.
///
/// # Errors
///
/// Returns [`LensError::Store`] when the store is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/ingest/run",
    tag = "Ingestion",
    summary = "Run an ingestion cycle now",
    description = "Fetches new logs from every enabled source and stores them with identity-key deduplication. Per-source failures are isolated and reported in the summary.",
    responses(
        (status = 200, description = "Cycle summary", body = IngestRunResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn run_ingest(State(state): State<AppState>) -> Result<impl IntoResponse, LensError> {
    let summary = state.pipeline.run_cycle().await?;
    Ok(Json(IngestRunResponse::from(summary)))
}

/// `GET /sources` — List configured sources with fetch progress.
///
/// # Errors
///
/// Returns [`LensError::Store`] when the store is unreachable.
#[utoipa::path(
    get,
    path = "/api/v1/sources",
    tag = "Sources",
    summary = "List sources",
    description = "Returns every configured source, enabled or not, with its fetch cursor state.",
    responses(
        (status = 200, description = "Source list", body = Vec<SourceStatusDto>),
    )
)]
pub async fn list_sources(State(state): State<AppState>) -> Result<impl IntoResponse, LensError> {
    let sources = state.store.list_sources().await?;
    let mut out = Vec::with_capacity(sources.len());
    for source in sources {
        let cursor = state.store.get_cursor(&source.source_id).await?;
        out.push(SourceStatusDto {
            source_id: source.source_id,
            name: source.name,
            enabled: source.enabled,
            last_record_timestamp: cursor.as_ref().map(|c| c.last_record_timestamp),
            last_success_at: cursor.as_ref().map(|c| c.last_success_at),
            records_fetched: cursor.map_or(0, |c| c.records_fetched),
        });
    }
    Ok(Json(out))
}

/// `PUT /sources/{id}` — Create or update a source.
///
/// # Errors
///
/// Returns [`LensError::InvalidRequest`] for a blank ID, or
/// [`LensError::Store`] on database failure.
#[utoipa::path(
    put,
    path = "/api/v1/sources/{id}",
    tag = "Sources",
    summary = "Create or update a source",
    description = "Registers an upstream profile for ingestion, or updates its name and enabled flag. Omitting the name keeps an existing one.",
    params(
        ("id" = String, Path, description = "Upstream profile ID"),
    ),
    request_body = SourceUpsertRequest,
    responses(
        (status = 204, description = "Source stored"),
        (status = 400, description = "Blank source ID", body = ErrorResponse),
    )
)]
pub async fn upsert_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SourceUpsertRequest>,
) -> Result<impl IntoResponse, LensError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(LensError::InvalidRequest("blank source id".to_string()));
    }
    state
        .store
        .upsert_source(id, req.name.as_deref(), req.enabled)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /sources/{id}` — Remove a source and its data.
///
/// # Errors
///
/// Returns [`LensError::SourceNotFound`] when the source does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/sources/{id}",
    tag = "Sources",
    summary = "Delete a source",
    description = "Removes a source together with its stored log records and fetch cursor.",
    params(
        ("id" = String, Path, description = "Upstream profile ID"),
    ),
    responses(
        (status = 204, description = "Source deleted"),
        (status = 404, description = "Source not found", body = ErrorResponse),
    )
)]
pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, LensError> {
    state.store.remove_source(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /settings/{key}` — Read one runtime setting.
///
/// # Errors
///
/// Returns [`LensError::SettingNotFound`] when the key has no value.
#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    tag = "Settings",
    summary = "Read a setting",
    description = "Returns the stored value for one runtime setting key.",
    params(
        ("key" = String, Path, description = "Setting key"),
    ),
    responses(
        (status = 200, description = "Setting value", body = SettingDto),
        (status = 404, description = "Unknown key", body = ErrorResponse),
    )
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, LensError> {
    let value = state
        .store
        .get_setting(&key)
        .await?
        .ok_or_else(|| LensError::SettingNotFound(key.clone()))?;
    Ok(Json(SettingDto { key, value }))
}

/// `PUT /settings/{key}` — Write one runtime setting.
///
/// Settings are re-read by the scheduler every cycle, so changes to the
/// API key, fetch limit, or interval apply without a restart.
///
/// # Errors
///
/// Returns [`LensError::InvalidRequest`] for a blank key, or
/// [`LensError::Store`] on database failure.
#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    tag = "Settings",
    summary = "Write a setting",
    description = "Stores a runtime setting value. The ingestion scheduler picks up changes on its next cycle without a restart.",
    params(
        ("key" = String, Path, description = "Setting key"),
    ),
    request_body = SettingUpdateRequest,
    responses(
        (status = 204, description = "Setting stored"),
        (status = 400, description = "Blank key", body = ErrorResponse),
    )
)]
pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SettingUpdateRequest>,
) -> Result<impl IntoResponse, LensError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(LensError::InvalidRequest("blank setting key".to_string()));
    }
    state.store.set_setting(key, &req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Operational routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingest/run", post(run_ingest))
        .route("/sources", get(list_sources))
        .route(
            "/sources/{id}",
            put(upsert_source).delete(delete_source),
        )
        .route("/settings/{key}", get(get_setting).put(put_setting))
}
