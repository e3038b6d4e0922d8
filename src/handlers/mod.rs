//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the sync
//! service: manual sync triggers, sync history, credential management and
//! conflict resolution.

use axum::extract::State;
use axum::response::Json;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod conflicts;
pub mod credentials;
pub mod sync;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness and database health probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    crate::db::health_check(&state.db).await.map_err(|e| {
        tracing::error!("health check failed: {:?}", e);
        ApiError::from(crate::error::ErrorType::ServiceUnavailable)
    })?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
