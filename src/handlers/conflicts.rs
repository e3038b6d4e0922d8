//! # Conflict API Handlers
//!
//! Lists open lead status conflicts and applies operator resolutions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::lead_status_conflict;
use crate::repositories::ConflictRepository;
use crate::server::AppState;
use crate::sync::conflict::Resolution;

/// One status conflict for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConflictInfo {
    /// Unique identifier for the conflict
    #[schema(value_type = String)]
    pub id: Uuid,
    /// Local lead the conflict is about
    #[schema(value_type = String)]
    pub lead_id: Uuid,
    /// Remote lead number the divergent status was reported for
    pub remote_lead_number: String,
    /// Snapshot of the local status at detection time
    pub local_status: String,
    /// Remote status code observed at detection time
    pub remote_status_code: i32,
    /// Timestamp when the divergence was detected, RFC 3339
    pub detected_at: String,
    /// Chosen resolution, unset while open
    pub resolution: Option<String>,
    /// Operator who resolved the conflict, unset while open
    pub resolved_by: Option<String>,
    /// Whether the conflict has been resolved
    pub is_resolved: bool,
}

impl From<lead_status_conflict::Model> for ConflictInfo {
    fn from(model: lead_status_conflict::Model) -> Self {
        Self {
            id: model.id,
            lead_id: model.lead_id,
            remote_lead_number: model.remote_lead_number,
            local_status: model.local_status,
            remote_status_code: model.remote_status_code,
            detected_at: model.detected_at.to_rfc3339(),
            resolution: model.resolution,
            resolved_by: model.resolved_by,
            is_resolved: model.is_resolved,
        }
    }
}

/// Response wrapper for the open conflict listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConflictsResponse {
    /// Open conflicts, oldest first
    pub conflicts: Vec<ConflictInfo>,
}

/// Request body for resolving a conflict
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ResolveConflictRequest {
    /// Which side wins: "local" or "remote"
    pub resolution: String,
    /// Identity of the operator making the call
    pub resolved_by: String,
}

/// Lists open status conflicts for one dealership
#[utoipa::path(
    get,
    path = "/dealerships/{dealership_id}/conflicts",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 200, description = "Open conflicts", body = ConflictsResponse)
    ),
    tag = "conflicts"
)]
pub async fn list_conflicts(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<Json<ConflictsResponse>, ApiError> {
    let repo = ConflictRepository::new(state.db.clone());
    let conflicts = repo.list_open(&dealership_id).await?;

    Ok(Json(ConflictsResponse {
        conflicts: conflicts.into_iter().map(ConflictInfo::from).collect(),
    }))
}

/// Resolves one conflict with the operator's decision
///
/// Choosing "remote" applies the remote status to the lead when the
/// transition is still legal; either way the conflict closes.
#[utoipa::path(
    post,
    path = "/dealerships/{dealership_id}/conflicts/{conflict_id}/resolve",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier"),
        ("conflict_id" = Uuid, Path, description = "Conflict identifier")
    ),
    request_body = ResolveConflictRequest,
    responses(
        (status = 200, description = "Conflict resolved", body = ConflictInfo),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Conflict not found", body = ApiError),
        (status = 409, description = "Conflict already resolved", body = ApiError)
    ),
    tag = "conflicts"
)]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    Path((dealership_id, conflict_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ResolveConflictRequest>,
) -> Result<Json<ConflictInfo>, ApiError> {
    let Some(resolution) = Resolution::parse(&body.resolution) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "resolution must be \"local\" or \"remote\"",
        ));
    };
    if body.resolved_by.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "resolved_by must not be empty",
        ));
    }

    let repo = ConflictRepository::new(state.db.clone());
    let conflict = repo
        .find_by_id(&dealership_id, &conflict_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Conflict not found")
        })?;

    if conflict.is_resolved {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Conflict is already resolved",
        ));
    }

    let resolved = state
        .leads
        .resolver()
        .resolve(&dealership_id, conflict, resolution, body.resolved_by.trim())
        .await?;

    Ok(Json(resolved.into()))
}
