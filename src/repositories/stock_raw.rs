//! Raw stock payload repository
//!
//! One row per (dealership, VIN), latest payload wins.

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::stock_raw_data::{self, Entity as StockRawData};

/// Repository for raw stock payload operations
#[derive(Debug, Clone)]
pub struct StockRawRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl StockRawRepository {
    /// Creates a new StockRawRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upserts the verbatim payload for one vehicle.
    pub async fn upsert(
        &self,
        dealership_id: Uuid,
        vin: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let active = stock_raw_data::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealership_id: Set(dealership_id),
            vin: Set(vin.to_string()),
            payload: Set(payload),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        StockRawData::insert(active)
            .on_conflict(
                OnConflict::columns([
                    stock_raw_data::Column::DealershipId,
                    stock_raw_data::Column::Vin,
                ])
                .update_columns([
                    stock_raw_data::Column::Payload,
                    stock_raw_data::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Fetches the stored payload for one vehicle.
    pub async fn find(
        &self,
        dealership_id: &Uuid,
        vin: &str,
    ) -> Result<Option<stock_raw_data::Model>> {
        Ok(StockRawData::find()
            .filter(stock_raw_data::Column::DealershipId.eq(*dealership_id))
            .filter(stock_raw_data::Column::Vin.eq(vin))
            .one(&*self.db)
            .await?)
    }
}
