//! StockRawData entity model
//!
//! This module contains the SeaORM entity model for the stock_raw_data
//! table: the verbatim external payload per vehicle, upserted latest-wins.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// StockRawData entity holding the raw payload for one vehicle
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_raw_data")]
pub struct Model {
    /// Unique identifier for the row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership the stock record belongs to
    pub dealership_id: Uuid,

    /// VIN identifying the vehicle within the dealership
    pub vin: String,

    /// Verbatim external stock payload
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    /// Timestamp of the last upsert
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
