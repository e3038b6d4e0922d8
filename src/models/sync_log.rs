//! SyncLog entity model
//!
//! This module contains the SeaORM entity model for the sync_logs table,
//! the append-only audit record of every sync attempt. Rows are never
//! mutated after insert.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SyncLog entity representing one sync attempt's outcome
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_logs")]
pub struct Model {
    /// Unique identifier for the log row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership the sync ran for
    pub dealership_id: Uuid,

    /// Which flow ran (stock, lead, lead_outbound, lead_status, ...)
    pub sync_type: String,

    /// Outcome classification (success, partial_success, failed)
    pub status: String,

    /// Number of items the sync attempted to process
    pub items_processed: i32,

    /// Number of items that succeeded
    pub items_succeeded: i32,

    /// Number of items that failed
    pub items_failed: i32,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: i64,

    /// Per-item error strings as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub errors: Option<JsonValue>,

    /// Timestamp when the sync finished
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
