//! Stock synchronization
//!
//! Pulls the full advertisement stock list for a dealership and folds it
//! into the vehicles table. One malformed record never aborts the batch;
//! the raw payload is kept verbatim per vehicle for audit.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Utc};
use metrics::{counter, histogram};
use sea_orm::Set;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::easycars::types::StockItem;
use crate::easycars::{ApiClient, EasyCarsError};
use crate::models::vehicle;
use crate::repositories::{
    CredentialRepository, StockRawRepository, SyncLogRepository, VehicleRepository,
    vehicle::DATA_SOURCE_EASYCARS,
};

use super::images::ImageSyncer;
use super::{SyncError, SyncReport, SyncType};

/// Sentinel for blank make/model fields.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for blank descriptions.
pub const NO_DESCRIPTION: &str = "No description available";

const YEAR_MIN: i32 = 1900;
const YEAR_MAX: i32 = 2100;

/// Normalized vehicle fields derived from one external stock item.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedStock {
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub odometer: i32,
    pub description: String,
    pub features: Option<serde_json::Value>,
}

/// Normalize one external stock item.
///
/// The external feed is loosely typed: years go missing, prices arrive as
/// formatted strings, text fields arrive blank. Everything is coerced into
/// the shapes the vehicles table expects.
pub fn map_stock_item(item: &StockItem) -> MappedStock {
    MappedStock {
        vin: item.vin.clone().filter(|v| !v.trim().is_empty()),
        stock_number: item.stock_number.clone().filter(|s| !s.trim().is_empty()),
        make: normalize_text(item.make.as_deref(), UNKNOWN),
        model: normalize_text(item.model.as_deref(), UNKNOWN),
        year: normalize_year(item.year),
        price: normalize_price(item.price.as_deref()),
        odometer: normalize_odometer(item.odometer),
        description: normalize_text(item.description.as_deref(), NO_DESCRIPTION),
        features: normalize_features(item.features.as_deref()),
    }
}

fn normalize_text(value: Option<&str>, sentinel: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => sentinel.to_string(),
    }
}

/// Years outside [1900, 2100] (or missing entirely) default to the last
/// calendar year.
fn normalize_year(year: Option<i32>) -> i32 {
    match year {
        Some(y) if (YEAR_MIN..=YEAR_MAX).contains(&y) => y,
        _ => Utc::now().year() - 1,
    }
}

/// Strip currency formatting and parse, flooring at zero.
fn normalize_price(price: Option<&str>) -> f64 {
    let Some(raw) = price else { return 0.0 };
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0).max(0.0)
}

fn normalize_odometer(odometer: Option<i64>) -> i32 {
    odometer.unwrap_or(0).clamp(0, i32::MAX as i64) as i32
}

/// Split a free-text feature list on commas and semicolons into a JSON
/// string array. Blank input maps to no feature list at all.
fn normalize_features(features: Option<&str>) -> Option<serde_json::Value> {
    let raw = features?.trim();
    if raw.is_empty() {
        return None;
    }
    let list: Vec<String> = raw
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if list.is_empty() {
        None
    } else {
        Some(serde_json::json!(list))
    }
}

/// Drives one dealership's stock sync end to end.
pub struct StockSyncOrchestrator {
    credentials: CredentialRepository,
    vehicles: VehicleRepository,
    stock_raw: StockRawRepository,
    sync_logs: SyncLogRepository,
    client: Arc<ApiClient>,
    images: Arc<ImageSyncer>,
}

impl StockSyncOrchestrator {
    pub fn new(
        credentials: CredentialRepository,
        vehicles: VehicleRepository,
        stock_raw: StockRawRepository,
        sync_logs: SyncLogRepository,
        client: Arc<ApiClient>,
        images: Arc<ImageSyncer>,
    ) -> Self {
        Self {
            credentials,
            vehicles,
            stock_raw,
            sync_logs,
            client,
            images,
        }
    }

    /// Run a full stock sync for one dealership.
    ///
    /// A missing credential and cancellation abort with an error; every
    /// other outcome, including a failed fetch, is folded into the returned
    /// report and logged.
    #[instrument(skip_all, fields(dealership_id = %dealership_id))]
    pub async fn sync_stock(
        &self,
        dealership_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();

        let Some(credential_row) = self.credentials.find_active(&dealership_id).await? else {
            let report = SyncReport::failed(
                "no active EasyCars credential".to_string(),
                started.elapsed().as_millis(),
            );
            self.sync_logs
                .record(dealership_id, SyncType::Stock, &report)
                .await;
            return Err(SyncError::NotConfigured);
        };
        let credentials = self.credentials.decrypt(&credential_row)?;

        let stocks = match self.client.get_stocks(&credentials, cancel).await {
            Ok(stocks) => stocks,
            Err(EasyCarsError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => {
                warn!("stock fetch failed: {}", e);
                let report = SyncReport::failed(e.to_string(), started.elapsed().as_millis());
                self.sync_logs
                    .record(dealership_id, SyncType::Stock, &report)
                    .await;
                return Ok(report);
            }
        };

        let mut succeeded = 0usize;
        let mut errors = Vec::new();

        for item in &stocks {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            // The verbatim payload is kept regardless of mapping outcome.
            if let Some(vin) = item.vin.as_deref().filter(|v| !v.is_empty()) {
                if let Err(e) = self
                    .stock_raw
                    .upsert(dealership_id, vin, serde_json::json!(item))
                    .await
                {
                    warn!(vin, "raw stock payload upsert failed: {}", e);
                }
            }

            match self.process_item(dealership_id, item, cancel).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    let label = item
                        .vin
                        .as_deref()
                        .or(item.stock_number.as_deref())
                        .unwrap_or("<unidentified>");
                    errors.push(format!("{}: {}", label, e));
                }
            }
        }

        let report = SyncReport::from_batch(succeeded, errors, started.elapsed().as_millis());
        counter!("stock_sync_runs_total", "status" => report.status.as_str()).increment(1);
        histogram!("stock_sync_duration_ms").record(report.duration_ms as f64);
        info!(
            processed = report.items_processed,
            succeeded = report.items_succeeded,
            failed = report.items_failed,
            status = report.status.as_str(),
            "stock sync finished"
        );

        self.sync_logs
            .record(dealership_id, SyncType::Stock, &report)
            .await;
        Ok(report)
    }

    /// Map one stock item into a vehicle row, creating or updating in
    /// place. Rows another integration owns are left alone.
    async fn process_item(
        &self,
        dealership_id: Uuid,
        item: &StockItem,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let mapped = map_stock_item(item);
        let existing = self
            .vehicles
            .find_match(
                &dealership_id,
                mapped.vin.as_deref(),
                mapped.stock_number.as_deref(),
            )
            .await?;

        let now = Utc::now().fixed_offset();

        let vehicle_model = match existing {
            Some(found) if found.data_source != DATA_SOURCE_EASYCARS => {
                info!(
                    vehicle_id = %found.id,
                    data_source = %found.data_source,
                    "vehicle owned by another source, skipping"
                );
                return Ok(());
            }
            Some(found) => {
                let mut active: vehicle::ActiveModel = found.into();
                active.vin = Set(mapped.vin.clone());
                active.stock_number = Set(mapped.stock_number.clone());
                active.make = Set(mapped.make);
                active.model = Set(mapped.model);
                active.year = Set(mapped.year);
                active.price = Set(mapped.price);
                active.odometer = Set(mapped.odometer);
                active.description = Set(mapped.description);
                active.features = Set(mapped.features);
                active.updated_at = Set(now);
                self.vehicles.update(active).await?
            }
            None => {
                let active = vehicle::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    dealership_id: Set(dealership_id),
                    vin: Set(mapped.vin.clone()),
                    stock_number: Set(mapped.stock_number.clone()),
                    make: Set(mapped.make),
                    model: Set(mapped.model),
                    year: Set(mapped.year),
                    price: Set(mapped.price),
                    odometer: Set(mapped.odometer),
                    description: Set(mapped.description),
                    features: Set(mapped.features),
                    images: Set(None),
                    data_source: Set(DATA_SOURCE_EASYCARS.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                self.vehicles.insert(active).await?
            }
        };

        if !item.images.is_empty() {
            let stored = self
                .images
                .download_and_store(&item.images, vehicle_model.id, cancel)
                .await;
            if !stored.is_empty() {
                let mut active: vehicle::ActiveModel = vehicle_model.into();
                active.images = Set(Some(serde_json::json!(stored)));
                active.updated_at = Set(Utc::now().fixed_offset());
                self.vehicles.update(active).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_clamped_to_sane_range() {
        let last_year = Utc::now().year() - 1;
        assert_eq!(normalize_year(Some(2022)), 2022);
        assert_eq!(normalize_year(Some(1900)), 1900);
        assert_eq!(normalize_year(Some(2100)), 2100);
        assert_eq!(normalize_year(Some(1899)), last_year);
        assert_eq!(normalize_year(Some(3000)), last_year);
        assert_eq!(normalize_year(None), last_year);
    }

    #[test]
    fn test_price_strips_formatting() {
        assert_eq!(normalize_price(Some("AU$25,999.00")), 25999.0);
        assert_eq!(normalize_price(Some("18990")), 18990.0);
        assert_eq!(normalize_price(Some("free")), 0.0);
        assert_eq!(normalize_price(Some("-500")), 0.0);
        assert_eq!(normalize_price(None), 0.0);
    }

    #[test]
    fn test_odometer_floored_at_zero() {
        assert_eq!(normalize_odometer(Some(84_000)), 84_000);
        assert_eq!(normalize_odometer(Some(-12)), 0);
        assert_eq!(normalize_odometer(None), 0);
    }

    #[test]
    fn test_blank_text_gets_sentinels() {
        let item = StockItem {
            make: Some("  ".to_string()),
            model: None,
            description: Some(String::new()),
            ..StockItem::default()
        };
        let mapped = map_stock_item(&item);
        assert_eq!(mapped.make, UNKNOWN);
        assert_eq!(mapped.model, UNKNOWN);
        assert_eq!(mapped.description, NO_DESCRIPTION);
    }

    #[test]
    fn test_features_split_on_commas_and_semicolons() {
        let features = normalize_features(Some("A/C; Bluetooth, Cruise Control ;, "));
        assert_eq!(
            features,
            Some(serde_json::json!(["A/C", "Bluetooth", "Cruise Control"]))
        );
        assert_eq!(normalize_features(Some("   ")), None);
        assert_eq!(normalize_features(None), None);
    }

    #[test]
    fn test_identifiers_blank_treated_as_missing() {
        let item = StockItem {
            vin: Some("  ".to_string()),
            stock_number: Some("STK-7".to_string()),
            ..StockItem::default()
        };
        let mapped = map_stock_item(&item);
        assert_eq!(mapped.vin, None);
        assert_eq!(mapped.stock_number.as_deref(), Some("STK-7"));
    }
}
