//! Migration to create the sync_logs table.
//!
//! Append-only audit trail. One row per sync attempt, never mutated.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncLogs::DealershipId).uuid().not_null())
                    .col(ColumnDef::new(SyncLogs::SyncType).text().not_null())
                    .col(ColumnDef::new(SyncLogs::Status).text().not_null())
                    .col(
                        ColumnDef::new(SyncLogs::ItemsProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::ItemsSucceeded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::ItemsFailed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::DurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncLogs::Errors).json_binary().null())
                    .col(
                        ColumnDef::new(SyncLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // History queries are always dealership-scoped and time-ordered
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_dealership_created")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::DealershipId)
                    .col(SyncLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_logs_dealership_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncLogs {
    Table,
    Id,
    DealershipId,
    SyncType,
    Status,
    ItemsProcessed,
    ItemsSucceeded,
    ItemsFailed,
    DurationMs,
    Errors,
    CreatedAt,
}
