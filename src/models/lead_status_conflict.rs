//! LeadStatusConflict entity model
//!
//! This module contains the SeaORM entity model for the
//! lead_status_conflicts table: a local/remote status divergence waiting
//! for an operator's decision.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// LeadStatusConflict entity representing a pending status divergence
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lead_status_conflicts")]
pub struct Model {
    /// Unique identifier for the conflict (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Dealership the conflicting lead belongs to
    pub dealership_id: Uuid,

    /// Local lead the conflict is about
    pub lead_id: Uuid,

    /// Remote lead number the divergent status was reported for
    pub remote_lead_number: String,

    /// Snapshot of the local status at detection time
    pub local_status: String,

    /// Remote status code observed at detection time
    pub remote_status_code: i32,

    /// Timestamp when the divergence was detected
    pub detected_at: DateTimeWithTimeZone,

    /// Chosen resolution ("local" or "remote"), unset while open
    pub resolution: Option<String>,

    /// Identity of the operator who resolved the conflict
    pub resolved_by: Option<String>,

    /// Timestamp when the conflict was resolved
    pub resolved_at: Option<DateTimeWithTimeZone>,

    /// Whether the conflict has been resolved
    pub is_resolved: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
