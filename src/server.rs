//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! EasyCars sync API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::easycars::{ApiClient, HttpTransport, TokenCache, Transport};
use crate::handlers;
use crate::repositories::{
    ConflictRepository, CredentialRepository, LeadRepository, StockRawRepository,
    SyncLogRepository, VehicleRepository,
};
use crate::sync::{
    ConflictResolver, ConflictStrategy, ImageSyncer, LeadSyncOrchestrator, StockSyncOrchestrator,
    images::{FilesystemImageStore, HttpImageSource},
};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub crypto_key: CryptoKey,
    pub stock: Arc<StockSyncOrchestrator>,
    pub leads: Arc<LeadSyncOrchestrator>,
    /// Cancelled on shutdown; in-flight syncs observe it.
    pub shutdown: CancellationToken,
}

/// Wires the orchestrators and shared clients into an [`AppState`].
pub fn build_state(
    config: AppConfig,
    db: DatabaseConnection,
    shutdown: CancellationToken,
) -> anyhow::Result<AppState> {
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(config.easycars.request_timeout_ms)?);
    build_state_with_transport(config, db, shutdown, transport)
}

/// Like [`build_state`] but with an injected transport, for tests.
pub fn build_state_with_transport(
    config: AppConfig,
    db: DatabaseConnection,
    shutdown: CancellationToken,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<AppState> {
    let crypto_key = CryptoKey::new(
        config
            .crypto_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("crypto key is not configured"))?,
    )?;

    let db = Arc::new(db);
    let tokens = Arc::new(TokenCache::new());
    let client = Arc::new(ApiClient::new(transport, tokens, config.easycars.clone()));

    let images = Arc::new(ImageSyncer::new(
        Arc::new(HttpImageSource::new(config.easycars.request_timeout_ms)?),
        Arc::new(FilesystemImageStore::new(
            config.image_sync.storage_dir.clone(),
            config.image_sync.public_base_url.clone(),
        )),
        &config.image_sync,
    ));

    let credentials = CredentialRepository::new(db.clone(), crypto_key.clone());
    let vehicles = VehicleRepository::new(db.clone());
    let lead_repo = LeadRepository::new(db.clone());
    let stock_raw = StockRawRepository::new(db.clone());
    let sync_logs = SyncLogRepository::new(db.clone());
    let conflicts = ConflictRepository::new(db.clone());

    let resolver = ConflictResolver::new(
        ConflictStrategy::from_config(&config.conflict_strategy),
        conflicts,
        lead_repo.clone(),
    );

    let stock = Arc::new(StockSyncOrchestrator::new(
        credentials.clone(),
        vehicles.clone(),
        stock_raw,
        sync_logs.clone(),
        client.clone(),
        images,
    ));
    let leads = Arc::new(LeadSyncOrchestrator::new(
        credentials,
        lead_repo,
        vehicles,
        sync_logs,
        client,
        resolver,
    ));

    Ok(AppState {
        config: Arc::new(config),
        db,
        crypto_key,
        stock,
        leads,
        shutdown,
    })
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/dealerships/{dealership_id}/sync/stock",
            post(handlers::sync::trigger_stock_sync),
        )
        .route(
            "/dealerships/{dealership_id}/sync/leads",
            post(handlers::sync::trigger_lead_sync),
        )
        .route(
            "/dealerships/{dealership_id}/sync/status",
            get(handlers::sync::sync_status),
        )
        .route(
            "/dealerships/{dealership_id}/sync/history",
            get(handlers::sync::sync_history),
        )
        .route(
            "/dealerships/{dealership_id}/sync/history/{log_id}",
            get(handlers::sync::sync_log_detail),
        )
        .route(
            "/dealerships/{dealership_id}/credentials",
            put(handlers::credentials::upsert_credential)
                .get(handlers::credentials::get_credential)
                .delete(handlers::credentials::delete_credential),
        )
        .route(
            "/dealerships/{dealership_id}/credentials/activation",
            post(handlers::credentials::set_credential_activation),
        )
        .route(
            "/dealerships/{dealership_id}/conflicts",
            get(handlers::conflicts::list_conflicts),
        )
        .route(
            "/dealerships/{dealership_id}/conflicts/{conflict_id}/resolve",
            post(handlers::conflicts::resolve_conflict),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given state
pub async fn run_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::sync::trigger_stock_sync,
        crate::handlers::sync::trigger_lead_sync,
        crate::handlers::sync::sync_status,
        crate::handlers::sync::sync_history,
        crate::handlers::sync::sync_log_detail,
        crate::handlers::credentials::upsert_credential,
        crate::handlers::credentials::get_credential,
        crate::handlers::credentials::set_credential_activation,
        crate::handlers::credentials::delete_credential,
        crate::handlers::conflicts::list_conflicts,
        crate::handlers::conflicts::resolve_conflict,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::sync::SyncReportResponse,
            crate::handlers::sync::SyncLogInfo,
            crate::handlers::sync::SyncStatusResponse,
            crate::handlers::sync::HistoryResponse,
            crate::handlers::credentials::CredentialRequest,
            crate::handlers::credentials::ActivationRequest,
            crate::handlers::credentials::CredentialInfo,
            crate::handlers::conflicts::ConflictInfo,
            crate::handlers::conflicts::ConflictsResponse,
            crate::handlers::conflicts::ResolveConflictRequest,
        )
    ),
    info(
        title = "EasyCars Sync API",
        description = "Operational API for the EasyCars dealership sync engine",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
