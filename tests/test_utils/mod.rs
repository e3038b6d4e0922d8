//! Test utilities for database and transport stubbing.
//!
//! Provides an in-memory SQLite database with migrations applied, a
//! scripted transport standing in for the external API, and fixture
//! helpers for dealership data.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use easycars_sync::easycars::{EasyCarsError, Transport, TransportRequest};
use easycars_sync::migration::{Migrator, MigratorTrait};
use easycars_sync::models::lead;
use easycars_sync::models::vehicle;
use easycars_sync::server::{AppState, build_state_with_transport};
use easycars_sync::config::AppConfig;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Transport stub that replays scripted JSON responses per endpoint path.
///
/// Token requests succeed by default so tests only script the calls they
/// care about. Unscripted calls fail as transport errors.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<serde_json::Value, EasyCarsError>>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, path: &str, response: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    #[allow(dead_code)]
    pub fn push_err(&self, path: &str, error: EasyCarsError) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(error));
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, EasyCarsError> {
        let mut responses = self.responses.lock().unwrap();
        let scripted = responses
            .iter_mut()
            .find(|(path, _)| request.url.ends_with(path.as_str()))
            .and_then(|(_, queue)| queue.pop_front());

        match scripted {
            Some(response) => response,
            None if request.url.ends_with("/token") => Ok(serde_json::json!({
                "responseCode": 0,
                "token": "tok-test",
            })),
            None => Err(EasyCarsError::Transport(format!(
                "unscripted request to {}",
                request.url
            ))),
        }
    }
}

/// Base configuration for tests: fixed crypto key, image sync disabled so
/// no real downloads happen.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        crypto_key: Some(vec![0u8; 32]),
        ..AppConfig::default()
    };
    config.image_sync.enabled = false;
    config
}

/// Builds a full application state over an in-memory database and the
/// given scripted transport.
pub async fn setup_state(
    config: AppConfig,
    transport: Arc<ScriptedTransport>,
) -> Result<AppState> {
    let db = setup_test_db().await?;
    build_state_with_transport(config, db, CancellationToken::new(), transport)
}

/// Stores an active test-environment credential for a dealership.
#[allow(dead_code)]
pub async fn insert_credential(state: &AppState, dealership_id: Uuid) -> Result<()> {
    use easycars_sync::easycars::Environment;
    use easycars_sync::repositories::{CredentialRepository, NewCredential};

    let repo = CredentialRepository::new(state.db.clone(), state.crypto_key.clone());
    repo.upsert(
        dealership_id,
        NewCredential {
            account_number: "ACC-1001".to_string(),
            account_secret: "s3cret".to_string(),
            client_id: None,
            client_secret: None,
            environment: Environment::Test,
            yard_code: None,
            is_active: true,
        },
    )
    .await?;
    Ok(())
}

/// Inserts a lead fixture, optionally already linked to a remote lead.
#[allow(dead_code)]
pub async fn insert_lead(
    db: &DatabaseConnection,
    dealership_id: Uuid,
    status: &str,
    easycars_lead_number: Option<&str>,
) -> Result<lead::Model> {
    let now = Utc::now().fixed_offset();
    let model = lead::ActiveModel {
        id: Set(Uuid::new_v4()),
        dealership_id: Set(dealership_id),
        customer_name: Set("Taylor Example".to_string()),
        customer_email: Set(Some("taylor@example.com".to_string())),
        customer_phone: Set(Some("0400 000 000".to_string())),
        vehicle_id: Set(None),
        status: Set(status.to_string()),
        easycars_lead_number: Set(easycars_lead_number.map(str::to_string)),
        easycars_customer_no: Set(None),
        last_known_easycars_status: Set(None),
        status_synced_at: Set(None),
        synced_at: Set(None),
        finance_interested: Set(false),
        rating: Set(None),
        raw_payload: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a vehicle fixture with the given origin tag.
#[allow(dead_code)]
pub async fn insert_vehicle(
    db: &DatabaseConnection,
    dealership_id: Uuid,
    vin: &str,
    data_source: &str,
) -> Result<vehicle::Model> {
    let now = Utc::now().fixed_offset();
    let model = vehicle::ActiveModel {
        id: Set(Uuid::new_v4()),
        dealership_id: Set(dealership_id),
        vin: Set(Some(vin.to_string())),
        stock_number: Set(Some("STK-1".to_string())),
        make: Set("Holden".to_string()),
        model: Set("Commodore".to_string()),
        year: Set(2018),
        price: Set(15_000.0),
        odometer: Set(88_000),
        description: Set("One owner".to_string()),
        features: Set(None),
        images: Set(None),
        data_source: Set(data_source.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}
