//! Lead status conflict repository
//!
//! At most one unresolved conflict exists per lead; detecting a divergence
//! while one is already open updates the open row instead of stacking a
//! second.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::lead_status_conflict::{self, Entity as LeadStatusConflict};

/// Repository for lead status conflict operations
#[derive(Debug, Clone)]
pub struct ConflictRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ConflictRepository {
    /// Creates a new ConflictRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The open conflict for a lead, if any.
    pub async fn find_open_by_lead(
        &self,
        lead_id: &Uuid,
    ) -> Result<Option<lead_status_conflict::Model>> {
        Ok(LeadStatusConflict::find()
            .filter(lead_status_conflict::Column::LeadId.eq(*lead_id))
            .filter(lead_status_conflict::Column::IsResolved.eq(false))
            .one(&*self.db)
            .await?)
    }

    /// Records a divergence, refreshing the open conflict if one already
    /// exists for the lead.
    pub async fn upsert_open(
        &self,
        dealership_id: Uuid,
        lead_id: Uuid,
        remote_lead_number: &str,
        local_status: &str,
        remote_status_code: i32,
    ) -> Result<lead_status_conflict::Model> {
        let now = Utc::now().fixed_offset();

        if let Some(open) = self.find_open_by_lead(&lead_id).await? {
            let mut active: lead_status_conflict::ActiveModel = open.into();
            active.local_status = Set(local_status.to_string());
            active.remote_status_code = Set(remote_status_code);
            active.detected_at = Set(now);
            return Ok(active.update(&*self.db).await?);
        }

        let active = lead_status_conflict::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealership_id: Set(dealership_id),
            lead_id: Set(lead_id),
            remote_lead_number: Set(remote_lead_number.to_string()),
            local_status: Set(local_status.to_string()),
            remote_status_code: Set(remote_status_code),
            detected_at: Set(now),
            resolution: Set(None),
            resolved_by: Set(None),
            resolved_at: Set(None),
            is_resolved: Set(false),
        };
        Ok(active.insert(&*self.db).await?)
    }

    /// Lists open conflicts for a dealership, oldest first.
    pub async fn list_open(
        &self,
        dealership_id: &Uuid,
    ) -> Result<Vec<lead_status_conflict::Model>> {
        Ok(LeadStatusConflict::find()
            .filter(lead_status_conflict::Column::DealershipId.eq(*dealership_id))
            .filter(lead_status_conflict::Column::IsResolved.eq(false))
            .order_by_asc(lead_status_conflict::Column::DetectedAt)
            .all(&*self.db)
            .await?)
    }

    /// Finds a conflict by ID within a dealership.
    pub async fn find_by_id(
        &self,
        dealership_id: &Uuid,
        conflict_id: &Uuid,
    ) -> Result<Option<lead_status_conflict::Model>> {
        Ok(LeadStatusConflict::find_by_id(*conflict_id)
            .filter(lead_status_conflict::Column::DealershipId.eq(*dealership_id))
            .one(&*self.db)
            .await?)
    }

    /// Closes a conflict with the operator's chosen resolution.
    pub async fn resolve(
        &self,
        conflict: lead_status_conflict::Model,
        resolution: &str,
        resolved_by: &str,
    ) -> Result<lead_status_conflict::Model> {
        if conflict.is_resolved {
            return Err(anyhow!("conflict {} is already resolved", conflict.id));
        }

        let mut active: lead_status_conflict::ActiveModel = conflict.into();
        active.resolution = Set(Some(resolution.to_string()));
        active.resolved_by = Set(Some(resolved_by.to_string()));
        active.resolved_at = Set(Some(Utc::now().fixed_offset()));
        active.is_resolved = Set(true);
        Ok(active.update(&*self.db).await?)
    }
}
