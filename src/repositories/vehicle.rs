//! Vehicle repository for database operations
//!
//! Matching during stock sync goes VIN first, then stock number. Only rows
//! sourced from EasyCars are ever matched or mutated; manually entered
//! inventory is invisible to the sync.

use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::vehicle::{self, Entity as Vehicle};

/// Rows created by the stock sync carry this data_source tag.
pub const DATA_SOURCE_EASYCARS: &str = "easycars";

/// Repository for vehicle database operations
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl VehicleRepository {
    /// Creates a new VehicleRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the vehicle a stock item maps onto, matching by VIN first and
    /// stock number second. The match is source-agnostic on purpose: the
    /// caller must inspect data_source and skip rows another integration
    /// owns instead of overwriting them.
    pub async fn find_match(
        &self,
        dealership_id: &Uuid,
        vin: Option<&str>,
        stock_number: Option<&str>,
    ) -> Result<Option<vehicle::Model>> {
        if let Some(vin) = vin.filter(|v| !v.is_empty()) {
            let found = Vehicle::find()
                .filter(vehicle::Column::DealershipId.eq(*dealership_id))
                .filter(vehicle::Column::Vin.eq(vin))
                .one(&*self.db)
                .await?;
            if found.is_some() {
                return Ok(found);
            }
        }

        if let Some(stock_number) = stock_number.filter(|s| !s.is_empty()) {
            return Ok(Vehicle::find()
                .filter(vehicle::Column::DealershipId.eq(*dealership_id))
                .filter(vehicle::Column::StockNumber.eq(stock_number))
                .one(&*self.db)
                .await?);
        }

        Ok(None)
    }

    /// Finds a vehicle by its primary key within a dealership.
    pub async fn find_by_id(
        &self,
        dealership_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<vehicle::Model>> {
        Ok(Vehicle::find_by_id(*id)
            .filter(vehicle::Column::DealershipId.eq(*dealership_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists all EasyCars-sourced vehicles for a dealership.
    pub async fn list_easycars(&self, dealership_id: &Uuid) -> Result<Vec<vehicle::Model>> {
        Ok(Vehicle::find()
            .filter(vehicle::Column::DealershipId.eq(*dealership_id))
            .filter(vehicle::Column::DataSource.eq(DATA_SOURCE_EASYCARS))
            .all(&*self.db)
            .await?)
    }

    /// Inserts a new vehicle row.
    pub async fn insert(&self, model: vehicle::ActiveModel) -> Result<vehicle::Model> {
        Ok(model.insert(&*self.db).await?)
    }

    /// Applies an update to an existing vehicle row.
    pub async fn update(&self, model: vehicle::ActiveModel) -> Result<vehicle::Model> {
        Ok(model.update(&*self.db).await?)
    }
}
