//! Integration tests for the stock sync flow against an in-memory database
//! and a scripted transport.

use easycars_sync::models::{StockRawData, SyncLog, Vehicle};
use easycars_sync::models::{stock_raw_data, sync_log, vehicle};
use easycars_sync::sync::SyncError;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{ScriptedTransport, insert_credential, insert_vehicle, setup_state, test_config};

const STOCKS_PATH: &str = "/Stock/GetAdvertisementStocks";

#[tokio::test]
async fn stock_sync_creates_vehicles_from_feed() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        STOCKS_PATH,
        json!({
            "responseCode": 0,
            "stocks": [
                {
                    "vin": "WAUZZZ4G7DN000001",
                    "stockNumber": "STK-100",
                    "make": "Audi",
                    "model": "A6",
                    "year": 2020,
                    "price": "$32,500.00",
                    "odometer": 41000,
                    "description": "Well kept",
                    "features": "Sunroof, Leather; Navigation"
                },
                {
                    "vin": "WAUZZZ4G7DN000002",
                    "stockNumber": "STK-101",
                    "year": 2035_000,
                    "price": "-500"
                }
            ]
        }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();

    let report = state
        .stock
        .sync_stock(dealership_id, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status.as_str(), "success");
    assert_eq!(report.items_succeeded, 2);

    let vehicles = Vehicle::find()
        .filter(vehicle::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(vehicles.len(), 2);

    let first = vehicles
        .iter()
        .find(|v| v.vin.as_deref() == Some("WAUZZZ4G7DN000001"))
        .unwrap();
    assert_eq!(first.make, "Audi");
    assert_eq!(first.price, 32500.0);
    assert_eq!(first.data_source, "easycars");
    assert_eq!(
        first.features,
        Some(json!(["Sunroof", "Leather", "Navigation"]))
    );

    // Sparse record falls back to sentinels and clamps.
    let second = vehicles
        .iter()
        .find(|v| v.vin.as_deref() == Some("WAUZZZ4G7DN000002"))
        .unwrap();
    assert_eq!(second.make, "Unknown");
    assert_eq!(second.description, "No description available");
    assert_eq!(second.price, 0.0);
    assert!(second.year < 2035);

    // Raw payloads are kept per VIN.
    let raw = StockRawData::find()
        .filter(stock_raw_data::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(raw.len(), 2);

    // And the run is audited.
    let logs = SyncLog::find()
        .filter(sync_log::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].sync_type, "stock");
    assert_eq!(logs[0].status, "success");
}

#[tokio::test]
async fn stock_sync_updates_existing_easycars_vehicle_in_place() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        STOCKS_PATH,
        json!({
            "responseCode": 0,
            "stocks": [{
                "vin": "JT2AE00E0P0000001",
                "stockNumber": "STK-1",
                "make": "Toyota",
                "model": "Corolla",
                "year": 2019,
                "price": "19990",
                "odometer": 60000
            }]
        }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    let existing = insert_vehicle(&state.db, dealership_id, "JT2AE00E0P0000001", "easycars")
        .await
        .unwrap();

    state
        .stock
        .sync_stock(dealership_id, &CancellationToken::new())
        .await
        .unwrap();

    let vehicles = Vehicle::find()
        .filter(vehicle::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].id, existing.id);
    assert_eq!(vehicles[0].make, "Toyota");
    assert_eq!(vehicles[0].price, 19990.0);
}

#[tokio::test]
async fn stock_sync_leaves_foreign_rows_alone() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        STOCKS_PATH,
        json!({
            "responseCode": 0,
            "stocks": [{
                "vin": "1HGCM82633A000001",
                "make": "Honda",
                "model": "Accord",
                "year": 2021,
                "price": "28000"
            }]
        }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();
    insert_vehicle(&state.db, dealership_id, "1HGCM82633A000001", "manual")
        .await
        .unwrap();

    let report = state
        .stock
        .sync_stock(dealership_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "success");

    // The manually entered row is neither overwritten nor duplicated.
    let vehicles = Vehicle::find()
        .filter(vehicle::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].make, "Holden");
    assert_eq!(vehicles[0].data_source, "manual");
}

#[tokio::test]
async fn stock_sync_without_credential_fails_and_is_audited() {
    let state = setup_state(test_config(), ScriptedTransport::new())
        .await
        .unwrap();
    let dealership_id = Uuid::new_v4();

    let result = state
        .stock
        .sync_stock(dealership_id, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SyncError::NotConfigured)));

    let logs = SyncLog::find()
        .filter(sync_log::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "failed");
}

#[tokio::test]
async fn stock_sync_fetch_failure_is_reported_not_raised() {
    let transport = ScriptedTransport::new();
    transport.push_ok(
        STOCKS_PATH,
        json!({ "responseCode": 9, "message": "backend offline" }),
    );

    let state = setup_state(test_config(), transport).await.unwrap();
    let dealership_id = Uuid::new_v4();
    insert_credential(&state, dealership_id).await.unwrap();

    let report = state
        .stock
        .sync_stock(dealership_id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.status.as_str(), "failed");
    assert_eq!(report.errors.len(), 1);

    let logs = SyncLog::find()
        .filter(sync_log::Column::DealershipId.eq(dealership_id))
        .all(&*state.db)
        .await
        .unwrap();
    assert_eq!(logs[0].status, "failed");
}
