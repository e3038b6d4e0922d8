//! Lead repository for database operations
//!
//! Query helpers for the three outbound lead flows (create, update, status
//! push) and the inbound reconciliation pass.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm::sea_query::Expr;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::lead::{self, Entity as Lead};

/// Repository for lead database operations
#[derive(Debug, Clone)]
pub struct LeadRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl LeadRepository {
    /// Creates a new LeadRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a lead by its primary key within a dealership.
    pub async fn find_by_id(
        &self,
        dealership_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<lead::Model>> {
        Ok(Lead::find_by_id(*id)
            .filter(lead::Column::DealershipId.eq(*dealership_id))
            .one(&*self.db)
            .await?)
    }

    /// Finds a lead by the remote lead number EasyCars assigned it.
    pub async fn find_by_remote_number(
        &self,
        dealership_id: &Uuid,
        lead_number: &str,
    ) -> Result<Option<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::DealershipId.eq(*dealership_id))
            .filter(lead::Column::EasycarsLeadNumber.eq(lead_number))
            .one(&*self.db)
            .await?)
    }

    /// Leads that have never been pushed to EasyCars.
    pub async fn find_unlinked(&self, dealership_id: &Uuid) -> Result<Vec<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::DealershipId.eq(*dealership_id))
            .filter(lead::Column::EasycarsLeadNumber.is_null())
            .all(&*self.db)
            .await?)
    }

    /// Linked leads whose local row changed after the last outbound sync.
    pub async fn find_stale_linked(&self, dealership_id: &Uuid) -> Result<Vec<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::DealershipId.eq(*dealership_id))
            .filter(lead::Column::EasycarsLeadNumber.is_not_null())
            .filter(
                Condition::any()
                    .add(lead::Column::SyncedAt.is_null())
                    .add(
                        Expr::col(lead::Column::UpdatedAt)
                            .gt(Expr::col(lead::Column::SyncedAt)),
                    ),
            )
            .all(&*self.db)
            .await?)
    }

    /// All linked leads, for the inbound reconciliation pass.
    pub async fn find_linked(&self, dealership_id: &Uuid) -> Result<Vec<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::DealershipId.eq(*dealership_id))
            .filter(lead::Column::EasycarsLeadNumber.is_not_null())
            .all(&*self.db)
            .await?)
    }

    /// Records the remote identifiers a successful create handed back and
    /// stamps the lead as synced.
    pub async fn mark_linked(
        &self,
        lead: lead::Model,
        lead_number: &str,
        customer_no: Option<&str>,
    ) -> Result<lead::Model> {
        let now = Utc::now().fixed_offset();
        let mut active: lead::ActiveModel = lead.into();
        active.easycars_lead_number = Set(Some(lead_number.to_string()));
        active.easycars_customer_no = Set(customer_no.map(|c| c.to_string()));
        active.synced_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(&*self.db).await?)
    }

    /// Stamps a linked lead as synced after a successful outbound update.
    pub async fn mark_synced(&self, lead: lead::Model) -> Result<lead::Model> {
        let now = Utc::now().fixed_offset();
        let mut active: lead::ActiveModel = lead.into();
        active.synced_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(&*self.db).await?)
    }

    /// Applies an update to an existing lead row.
    pub async fn update(&self, model: lead::ActiveModel) -> Result<lead::Model> {
        Ok(model.update(&*self.db).await?)
    }
}
