//! Migration to create the lead_status_conflicts table.
//!
//! Records detected divergence between local and remote lead status that is
//! waiting for operator resolution. At most one unresolved row per lead.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LeadStatusConflicts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LeadStatusConflicts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LeadStatusConflicts::DealershipId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LeadStatusConflicts::LeadId).uuid().not_null())
                    .col(
                        ColumnDef::new(LeadStatusConflicts::RemoteLeadNumber)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LeadStatusConflicts::LocalStatus)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LeadStatusConflicts::RemoteStatusCode)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LeadStatusConflicts::DetectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(LeadStatusConflicts::Resolution).text().null())
                    .col(ColumnDef::new(LeadStatusConflicts::ResolvedBy).text().null())
                    .col(
                        ColumnDef::new(LeadStatusConflicts::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LeadStatusConflicts::IsResolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lead_status_conflicts_dealership_unresolved")
                    .table(LeadStatusConflicts::Table)
                    .col(LeadStatusConflicts::DealershipId)
                    .col(LeadStatusConflicts::IsResolved)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lead_status_conflicts_lead_id")
                    .table(LeadStatusConflicts::Table)
                    .col(LeadStatusConflicts::LeadId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_lead_status_conflicts_lead_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_lead_status_conflicts_dealership_unresolved")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(LeadStatusConflicts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LeadStatusConflicts {
    Table,
    Id,
    DealershipId,
    LeadId,
    RemoteLeadNumber,
    LocalStatus,
    RemoteStatusCode,
    DetectedAt,
    Resolution,
    ResolvedBy,
    ResolvedAt,
    IsResolved,
}
