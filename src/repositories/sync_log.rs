//! SyncLog repository for database operations
//!
//! Writes are best-effort: a failed audit insert is logged and swallowed so
//! it never turns a successful sync into a failure.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::sync_log::{self, Entity as SyncLog};
use crate::sync::{SyncReport, SyncType};

/// Repository for sync log database operations
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SyncLogRepository {
    /// Creates a new SyncLogRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a sync outcome. Failures are logged and swallowed.
    pub async fn record(
        &self,
        dealership_id: Uuid,
        sync_type: SyncType,
        report: &SyncReport,
    ) -> Option<sync_log::Model> {
        let errors = if report.errors.is_empty() {
            None
        } else {
            Some(serde_json::json!(report.errors))
        };

        let active = sync_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealership_id: Set(dealership_id),
            sync_type: Set(sync_type.as_str().to_string()),
            status: Set(report.status.as_str().to_string()),
            items_processed: Set(report.items_processed as i32),
            items_succeeded: Set(report.items_succeeded as i32),
            items_failed: Set(report.items_failed as i32),
            duration_ms: Set(report.duration_ms as i64),
            errors: Set(errors),
            created_at: Set(Utc::now().fixed_offset()),
        };

        match active.insert(&*self.db).await {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::error!(
                    dealership_id = %dealership_id,
                    sync_type = sync_type.as_str(),
                    "Failed to record sync log: {}",
                    e
                );
                None
            }
        }
    }

    /// Most recent log row for a dealership, optionally scoped to one flow.
    pub async fn latest(
        &self,
        dealership_id: &Uuid,
        sync_type: Option<SyncType>,
    ) -> Result<Option<sync_log::Model>> {
        let mut query = SyncLog::find()
            .filter(sync_log::Column::DealershipId.eq(*dealership_id))
            .order_by_desc(sync_log::Column::CreatedAt);

        if let Some(sync_type) = sync_type {
            query = query.filter(sync_log::Column::SyncType.eq(sync_type.as_str()));
        }

        Ok(query.one(&*self.db).await?)
    }

    /// Paginated history for a dealership, newest first.
    pub async fn history(
        &self,
        dealership_id: &Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<sync_log::Model>, u64)> {
        let base = SyncLog::find().filter(sync_log::Column::DealershipId.eq(*dealership_id));

        let total = base.clone().count(&*self.db).await?;
        let rows = base
            .order_by_desc(sync_log::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await?;

        Ok((rows, total))
    }

    /// Finds one log row by ID within a dealership.
    pub async fn find_by_id(
        &self,
        dealership_id: &Uuid,
        log_id: &Uuid,
    ) -> Result<Option<sync_log::Model>> {
        Ok(SyncLog::find_by_id(*log_id)
            .filter(sync_log::Column::DealershipId.eq(*dealership_id))
            .one(&*self.db)
            .await?)
    }
}
