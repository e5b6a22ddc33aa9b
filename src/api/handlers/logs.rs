//! Log listing endpoint.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{LogsParams, LogsResponse, MAX_PAGE_SIZE, parse_range, split_csv};
use crate::app_state::AppState;
use crate::domain::{DomainExclusion, RangeToken, resolve};
use crate::error::{ErrorResponse, LensError};
use crate::persistence::{BaseFilter, LogStore, RecordQuery, StatusFilter};

/// `GET /logs` — Paged log listing, newest first.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] or [`LensError::InvalidRequest`]
/// on bad query parameters.
#[utoipa::path(
    get,
    path = "/api/v1/logs",
    tag = "Logs",
    summary = "List DNS query logs",
    description = "Returns one page of stored DNS query records, newest first, with the total match count. Supports source, time-range, status, device, substring-search, and domain-exclusion filters.",
    params(LogsParams),
    responses(
        (status = 200, description = "One page of records", body = LogsResponse),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    // `all` means no time cutoff for a listing.
    let since = if token == RangeToken::All {
        None
    } else {
        Some(resolve(token, Utc::now(), None).start)
    };

    let status: StatusFilter = params
        .status
        .as_deref()
        .unwrap_or("all")
        .parse()
        .map_err(LensError::InvalidRequest)?;

    let limit = params.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let query = RecordQuery {
        base: BaseFilter {
            source_id: params.source,
            since,
            exclusion: DomainExclusion::compile(&split_csv(params.exclude.as_deref())),
        },
        search: params.search,
        status,
        devices: split_csv(params.devices.as_deref()),
        limit,
        offset,
    };

    let (data, total) = state.store.query_records(&query).await?;
    Ok(Json(LogsResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// Log routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/logs", get(list_logs))
}
