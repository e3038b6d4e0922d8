//! Vehicle entity model
//!
//! This module contains the SeaORM entity model for the vehicles table.
//! The data_source column records which integration owns a row; the stock
//! sync only ever mutates rows tagged as EasyCars-sourced.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Vehicle entity representing one unit of dealership inventory
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    /// Unique identifier for the vehicle (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership that owns this vehicle
    pub dealership_id: Uuid,

    /// Vehicle identification number, when known
    pub vin: Option<String>,

    /// Dealer-assigned stock number, when known
    pub stock_number: Option<String>,

    /// Manufacturer name
    pub make: String,

    /// Model name
    pub model: String,

    /// Model year, clamped to a sane range during mapping
    pub year: i32,

    /// Advertised price, floored at zero
    pub price: f64,

    /// Odometer reading, floored at zero
    pub odometer: i32,

    /// Free-text description
    pub description: String,

    /// Feature list stored as a JSON string array
    #[sea_orm(column_type = "JsonBinary")]
    pub features: Option<JsonValue>,

    /// Hosted image URLs stored as a JSON string array
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Option<JsonValue>,

    /// Origin of this row ("easycars" or another source)
    pub data_source: String,

    /// Timestamp when the vehicle was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the vehicle was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
