//! # Sync API Handlers
//!
//! Manual sync triggers and the sync history surface. Triggers are
//! rate-limited per dealership so an operator mashing the button cannot
//! hammer the external API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, rate_limited};
use crate::models::sync_log;
use crate::repositories::SyncLogRepository;
use crate::server::AppState;
use crate::sync::{SyncReport, SyncType};

/// Outcome of one sync run, as returned to API callers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncReportResponse {
    /// Outcome classification: success, partial_success or failed
    pub status: String,
    /// Number of items the sync attempted to process
    pub items_processed: usize,
    /// Number of items that succeeded
    pub items_succeeded: usize,
    /// Number of items that failed
    pub items_failed: usize,
    /// Per-item error descriptions
    pub errors: Vec<String>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl From<SyncReport> for SyncReportResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            status: report.status.as_str().to_string(),
            items_processed: report.items_processed,
            items_succeeded: report.items_succeeded,
            items_failed: report.items_failed,
            errors: report.errors,
            duration_ms: report.duration_ms as u64,
        }
    }
}

/// One sync log row for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncLogInfo {
    /// Unique identifier for the log row
    #[schema(value_type = String)]
    pub id: Uuid,
    /// Which flow ran (stock, lead, lead_status)
    pub sync_type: String,
    /// Outcome classification
    pub status: String,
    /// Number of items the sync attempted to process
    pub items_processed: i32,
    /// Number of items that succeeded
    pub items_succeeded: i32,
    /// Number of items that failed
    pub items_failed: i32,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: i64,
    /// Per-item error strings, when any item failed
    pub errors: Option<serde_json::Value>,
    /// Timestamp when the sync finished, RFC 3339
    pub created_at: String,
}

impl From<sync_log::Model> for SyncLogInfo {
    fn from(model: sync_log::Model) -> Self {
        Self {
            id: model.id,
            sync_type: model.sync_type,
            status: model.status,
            items_processed: model.items_processed,
            items_succeeded: model.items_succeeded,
            items_failed: model.items_failed,
            duration_ms: model.duration_ms,
            errors: model.errors,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Latest run per flow for one dealership
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncStatusResponse {
    /// Most recent stock sync, if any has run
    pub stock: Option<SyncLogInfo>,
    /// Most recent lead sync, if any has run
    pub lead: Option<SyncLogInfo>,
    /// Most recent status reconciliation, if any has run
    pub lead_status: Option<SyncLogInfo>,
}

/// Query parameters for sync history listing
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Maximum number of rows to return (default: 50, max: 200)
    pub limit: Option<u64>,
    /// Number of rows to skip
    pub offset: Option<u64>,
}

/// Paginated sync history response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Log rows, newest first
    pub logs: Vec<SyncLogInfo>,
    /// Total number of rows for this dealership
    pub total: u64,
    /// Echo of the applied limit
    pub limit: u64,
    /// Echo of the applied offset
    pub offset: u64,
}

/// Triggers a stock sync for one dealership
#[utoipa::path(
    post,
    path = "/dealerships/{dealership_id}/sync/stock",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 200, description = "Sync finished", body = SyncReportResponse),
        (status = 400, description = "Dealership has no active credential", body = ApiError),
        (status = 429, description = "A sync ran too recently", body = ApiError),
        (status = 502, description = "Upstream API failure", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn trigger_stock_sync(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<Json<SyncReportResponse>, ApiError> {
    enforce_trigger_spacing(&state, &dealership_id, SyncType::Stock).await?;

    let report = state
        .stock
        .sync_stock(dealership_id, &state.shutdown)
        .await?;
    Ok(Json(report.into()))
}

/// Triggers a lead sync for one dealership
///
/// Runs the outbound push (creates and updates) followed by the inbound
/// refresh, reported as a single run.
#[utoipa::path(
    post,
    path = "/dealerships/{dealership_id}/sync/leads",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 200, description = "Sync finished", body = SyncReportResponse),
        (status = 400, description = "Dealership has no active credential", body = ApiError),
        (status = 429, description = "A sync ran too recently", body = ApiError),
        (status = 502, description = "Upstream API failure", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn trigger_lead_sync(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<Json<SyncReportResponse>, ApiError> {
    enforce_trigger_spacing(&state, &dealership_id, SyncType::Lead).await?;

    let report = state
        .leads
        .run_lead_sync(dealership_id, &state.shutdown)
        .await?;
    Ok(Json(report.into()))
}

/// Returns the latest run per flow for one dealership
#[utoipa::path(
    get,
    path = "/dealerships/{dealership_id}/sync/status",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 200, description = "Latest run per flow", body = SyncStatusResponse)
    ),
    tag = "sync"
)]
pub async fn sync_status(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let sync_logs = SyncLogRepository::new(state.db.clone());

    let stock = sync_logs.latest(&dealership_id, Some(SyncType::Stock)).await?;
    let lead = sync_logs.latest(&dealership_id, Some(SyncType::Lead)).await?;
    let lead_status = sync_logs
        .latest(&dealership_id, Some(SyncType::LeadStatus))
        .await?;

    Ok(Json(SyncStatusResponse {
        stock: stock.map(SyncLogInfo::from),
        lead: lead.map(SyncLogInfo::from),
        lead_status: lead_status.map(SyncLogInfo::from),
    }))
}

/// Returns paginated sync history for one dealership, newest first
#[utoipa::path(
    get,
    path = "/dealerships/{dealership_id}/sync/history",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Sync history page", body = HistoryResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync_history(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "limit must be between 1 and 200",
        ));
    }
    let offset = query.offset.unwrap_or(0);

    let sync_logs = SyncLogRepository::new(state.db.clone());
    let (rows, total) = sync_logs.history(&dealership_id, limit, offset).await?;

    Ok(Json(HistoryResponse {
        logs: rows.into_iter().map(SyncLogInfo::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Returns one sync log row by ID
#[utoipa::path(
    get,
    path = "/dealerships/{dealership_id}/sync/history/{log_id}",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier"),
        ("log_id" = Uuid, Path, description = "Sync log identifier")
    ),
    responses(
        (status = 200, description = "Sync log row", body = SyncLogInfo),
        (status = 404, description = "Log row not found", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync_log_detail(
    State(state): State<AppState>,
    Path((dealership_id, log_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SyncLogInfo>, ApiError> {
    let sync_logs = SyncLogRepository::new(state.db.clone());
    let row = sync_logs
        .find_by_id(&dealership_id, &log_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Sync log not found")
        })?;
    Ok(Json(row.into()))
}

/// Rejects a manual trigger when the last run of the same flow is younger
/// than the configured minimum spacing.
async fn enforce_trigger_spacing(
    state: &AppState,
    dealership_id: &Uuid,
    sync_type: SyncType,
) -> Result<(), ApiError> {
    let sync_logs = SyncLogRepository::new(state.db.clone());
    let Some(latest) = sync_logs.latest(dealership_id, Some(sync_type)).await? else {
        return Ok(());
    };

    let min_interval = state.config.sync_trigger_min_interval_seconds as i64;
    let elapsed = Utc::now()
        .signed_duration_since(latest.created_at.with_timezone(&Utc))
        .num_seconds();

    if elapsed < min_interval {
        let remaining = (min_interval - elapsed).max(1) as u64;
        return Err(rate_limited(remaining));
    }
    Ok(())
}
