//! # Credential API Handlers
//!
//! Credential management for dealerships. Secrets are accepted in request
//! bodies, encrypted at rest, and never returned: reads expose only
//! presence flags.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::easycars::Environment;
use crate::error::{ApiError, validation_error};
use crate::models::dealer_credential;
use crate::repositories::{CredentialRepository, NewCredential};
use crate::server::AppState;

/// Request body for creating or replacing a dealership credential
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CredentialRequest {
    /// EasyCars account number
    pub account_number: String,
    /// EasyCars account secret
    pub account_secret: String,
    /// Optional OAuth-style client ID
    pub client_id: Option<String>,
    /// Optional OAuth-style client secret
    pub client_secret: Option<String>,
    /// Target environment: "test" or "production"
    pub environment: String,
    /// Optional yard code scoping the stock feed
    pub yard_code: Option<String>,
    /// Whether scheduled syncs should run (default: true)
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

/// Request body for toggling scheduled syncs
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ActivationRequest {
    /// Whether scheduled syncs should run
    pub is_active: bool,
}

/// Credential information for API responses. Secrets never appear here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialInfo {
    /// Unique identifier for the credential
    #[schema(value_type = String)]
    pub id: Uuid,
    /// Dealership the credential belongs to
    #[schema(value_type = String)]
    pub dealership_id: Uuid,
    /// Target environment
    pub environment: String,
    /// Yard code scoping the stock feed, when set
    pub yard_code: Option<String>,
    /// Whether scheduled syncs run
    pub is_active: bool,
    /// Indicates whether an encrypted client ID is stored
    pub has_client_id: bool,
    /// Indicates whether an encrypted client secret is stored
    pub has_client_secret: bool,
    /// Timestamp when the credential was created, RFC 3339
    pub created_at: String,
    /// Timestamp when the credential was last updated, RFC 3339
    pub updated_at: String,
}

impl From<dealer_credential::Model> for CredentialInfo {
    fn from(model: dealer_credential::Model) -> Self {
        Self {
            id: model.id,
            dealership_id: model.dealership_id,
            environment: model.environment,
            yard_code: model.yard_code,
            is_active: model.is_active,
            has_client_id: model.client_id_ciphertext.is_some(),
            has_client_secret: model.client_secret_ciphertext.is_some(),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Creates or replaces the credential for a dealership
#[utoipa::path(
    put,
    path = "/dealerships/{dealership_id}/credentials",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    request_body = CredentialRequest,
    responses(
        (status = 200, description = "Credential stored", body = CredentialInfo),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "credentials"
)]
pub async fn upsert_credential(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
    Json(body): Json<CredentialRequest>,
) -> Result<Json<CredentialInfo>, ApiError> {
    validate_credential_request(&body)?;

    let repo = CredentialRepository::new(state.db.clone(), state.crypto_key.clone());
    let model = repo
        .upsert(
            dealership_id,
            NewCredential {
                account_number: body.account_number,
                account_secret: body.account_secret,
                client_id: body.client_id.filter(|v| !v.is_empty()),
                client_secret: body.client_secret.filter(|v| !v.is_empty()),
                environment: Environment::from_db(&body.environment),
                yard_code: body.yard_code.filter(|v| !v.is_empty()),
                is_active: body.is_active,
            },
        )
        .await?;

    Ok(Json(model.into()))
}

/// Returns the credential for a dealership, secrets masked
#[utoipa::path(
    get,
    path = "/dealerships/{dealership_id}/credentials",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 200, description = "Stored credential", body = CredentialInfo),
        (status = 404, description = "No credential stored", body = ApiError)
    ),
    tag = "credentials"
)]
pub async fn get_credential(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<Json<CredentialInfo>, ApiError> {
    let repo = CredentialRepository::new(state.db.clone(), state.crypto_key.clone());
    let model = repo
        .find_by_dealership(&dealership_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "No credential stored")
        })?;
    Ok(Json(model.into()))
}

/// Toggles whether scheduled syncs run for a dealership
#[utoipa::path(
    post,
    path = "/dealerships/{dealership_id}/credentials/activation",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Activation updated", body = CredentialInfo),
        (status = 404, description = "No credential stored", body = ApiError)
    ),
    tag = "credentials"
)]
pub async fn set_credential_activation(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
    Json(body): Json<ActivationRequest>,
) -> Result<Json<CredentialInfo>, ApiError> {
    let repo = CredentialRepository::new(state.db.clone(), state.crypto_key.clone());
    let model = repo
        .set_active(&dealership_id, body.is_active)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "No credential stored")
        })?;
    Ok(Json(model.into()))
}

/// Soft-deletes the credential for a dealership
#[utoipa::path(
    delete,
    path = "/dealerships/{dealership_id}/credentials",
    params(
        ("dealership_id" = Uuid, Path, description = "Dealership identifier")
    ),
    responses(
        (status = 204, description = "Credential deleted"),
        (status = 404, description = "No credential stored", body = ApiError)
    ),
    tag = "credentials"
)]
pub async fn delete_credential(
    State(state): State<AppState>,
    Path(dealership_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = CredentialRepository::new(state.db.clone(), state.crypto_key.clone());
    if repo.soft_delete(&dealership_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "No credential stored",
        ))
    }
}

fn validate_credential_request(body: &CredentialRequest) -> Result<(), ApiError> {
    let mut field_errors = serde_json::Map::new();

    if body.account_number.trim().is_empty() {
        field_errors.insert(
            "account_number".to_string(),
            serde_json::json!("must not be empty"),
        );
    }
    if body.account_secret.trim().is_empty() {
        field_errors.insert(
            "account_secret".to_string(),
            serde_json::json!("must not be empty"),
        );
    }
    if !matches!(body.environment.as_str(), "test" | "production") {
        field_errors.insert(
            "environment".to_string(),
            serde_json::json!("must be \"test\" or \"production\""),
        );
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error(
            "Invalid credential request",
            serde_json::Value::Object(field_errors),
        ))
    }
}
