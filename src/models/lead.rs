//! Lead entity model
//!
//! This module contains the SeaORM entity model for the leads table. A lead
//! becomes "linked" once easycars_lead_number is set; every sync flow must
//! preserve that link afterwards.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Lead entity representing a customer enquiry
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership this lead belongs to
    pub dealership_id: Uuid,

    /// Customer display name
    pub customer_name: String,

    /// Customer email address, when supplied
    pub customer_email: Option<String>,

    /// Customer phone number, when supplied
    pub customer_phone: Option<String>,

    /// Vehicle of interest, when the enquiry referenced one
    pub vehicle_id: Option<Uuid>,

    /// Local lead status (see sync::status::LeadStatus)
    pub status: String,

    /// Remote lead number assigned by EasyCars once linked
    pub easycars_lead_number: Option<String>,

    /// Remote customer number assigned by EasyCars once linked
    pub easycars_customer_no: Option<String>,

    /// Last remote status code observed during reconciliation
    pub last_known_easycars_status: Option<i32>,

    /// Timestamp of the last status observation or push
    pub status_synced_at: Option<DateTimeWithTimeZone>,

    /// Timestamp of the last successful full outbound sync
    pub synced_at: Option<DateTimeWithTimeZone>,

    /// Whether the customer expressed finance interest
    pub finance_interested: bool,

    /// Remote lead rating, mirrored on inbound sync
    pub rating: Option<String>,

    /// Verbatim remote payload from the last inbound sync
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_payload: Option<JsonValue>,

    /// Timestamp when the lead was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the lead was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
