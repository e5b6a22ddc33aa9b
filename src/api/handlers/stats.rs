//! Analytics endpoints: overview, top domains/TLDs, devices, time series.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{DeviceParams, SeriesParams, StatsParams, TopParams, parse_range, split_csv};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LensError};
use crate::service::{
    DeviceUsage, SeriesGrouping, StatsOverview, TimeSeries, TopGroups,
};

/// `GET /stats` — Overview counters for the filtered population.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] for an unknown range token.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Stats",
    summary = "Query statistics overview",
    description = "Returns total/blocked/allowed counts, blocked percentage, queries per hour, the most recently active device, and the top blocked domain for the selected range.",
    params(StatsParams),
    responses(
        (status = 200, description = "Overview counters", body = StatsOverview),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    let exclude = split_csv(params.exclude.as_deref());
    let body = state
        .stats
        .overview(params.source.as_deref(), token, &exclude)
        .await?;
    Ok(Json(body))
}

/// `GET /stats/domains` — Top domains per blocked/allowed partition.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] for an unknown range token.
#[utoipa::path(
    get,
    path = "/api/v1/stats/domains",
    tag = "Stats",
    summary = "Top domains",
    description = "Returns the highest-count domains among blocked and allowed records. Percentages are relative to the overall filtered total.",
    params(TopParams),
    responses(
        (status = 200, description = "Top domains per partition", body = TopGroups),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn top_domains(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    let exclude = split_csv(params.exclude.as_deref());
    let body = state
        .stats
        .top_domains(
            params.source.as_deref(),
            token,
            &exclude,
            params.clamped_limit(),
        )
        .await?;
    Ok(Json(body))
}

/// `GET /stats/tlds` — Top TLDs per blocked/allowed partition.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] for an unknown range token.
#[utoipa::path(
    get,
    path = "/api/v1/stats/tlds",
    tag = "Stats",
    summary = "Top TLDs",
    description = "Returns the highest-count registrable labels among blocked and allowed records, grouped on the TLD derived at ingest time.",
    params(TopParams),
    responses(
        (status = 200, description = "Top TLDs per partition", body = TopGroups),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn top_tlds(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    let exclude = split_csv(params.exclude.as_deref());
    let body = state
        .stats
        .top_tlds(
            params.source.as_deref(),
            token,
            &exclude,
            params.clamped_limit(),
        )
        .await?;
    Ok(Json(body))
}

/// `GET /stats/devices` — Per-device usage rollup.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] for an unknown range token.
#[utoipa::path(
    get,
    path = "/api/v1/stats/devices",
    tag = "Stats",
    summary = "Device usage",
    description = "Returns per-device query counts with blocked/allowed split and last-activity timestamps. Records without a device name report as \"Unidentified Device\".",
    params(DeviceParams),
    responses(
        (status = 200, description = "Per-device usage", body = Vec<DeviceUsage>),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn device_usage(
    State(state): State<AppState>,
    Query(params): Query<DeviceParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    let exclude = split_csv(params.exclude.as_deref());
    let exclude_devices = split_csv(params.exclude_devices.as_deref());
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let body = state
        .stats
        .device_usage(
            params.source.as_deref(),
            token,
            &exclude,
            &exclude_devices,
            limit,
        )
        .await?;
    Ok(Json(body))
}

/// `GET /stats/timeseries` — Bucketed query counts over time.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] or [`LensError::InvalidRequest`]
/// on bad query parameters.
#[utoipa::path(
    get,
    path = "/api/v1/stats/timeseries",
    tag = "Stats",
    summary = "Query volume time series",
    description = "Returns per-bucket query counts over the selected range, grouped by blocked status (default) or by source. Bucket boundaries are alignment-normalized so repeated queries return stable buckets.",
    params(SeriesParams),
    responses(
        (status = 200, description = "Bucketed counts", body = TimeSeries),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
    )
)]
pub async fn time_series(
    State(state): State<AppState>,
    Query(params): Query<SeriesParams>,
) -> Result<impl IntoResponse, LensError> {
    let token = parse_range(params.range.as_deref())?;
    let exclude = split_csv(params.exclude.as_deref());
    let grouping: SeriesGrouping = params
        .group_by
        .as_deref()
        .unwrap_or("status")
        .parse()
        .map_err(LensError::InvalidRequest)?;
    let body = state
        .stats
        .time_series(params.source.as_deref(), token, &exclude, grouping)
        .await?;
    Ok(Json(body))
}

/// Analytics routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(overview))
        .route("/stats/domains", get(top_domains))
        .route("/stats/tlds", get(top_tlds))
        .route("/stats/devices", get(device_usage))
        .route("/stats/timeseries", get(time_series))
}
