//! Migration to create the leads table.
//!
//! Local enquiry records. The easycars_* columns link a lead to its remote
//! counterpart once it has been pushed to or pulled from EasyCars.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::DealershipId).uuid().not_null())
                    .col(ColumnDef::new(Leads::CustomerName).text().not_null())
                    .col(ColumnDef::new(Leads::CustomerEmail).text().null())
                    .col(ColumnDef::new(Leads::CustomerPhone).text().null())
                    .col(ColumnDef::new(Leads::VehicleId).uuid().null())
                    .col(
                        ColumnDef::new(Leads::Status)
                            .text()
                            .not_null()
                            .default("received"),
                    )
                    .col(ColumnDef::new(Leads::EasycarsLeadNumber).text().null())
                    .col(ColumnDef::new(Leads::EasycarsCustomerNo).text().null())
                    .col(
                        ColumnDef::new(Leads::LastKnownEasycarsStatus)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::StatusSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::SyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::FinanceInterested)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Leads::Rating).text().null())
                    .col(ColumnDef::new(Leads::RawPayload).json_binary().null())
                    .col(
                        ColumnDef::new(Leads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_dealership_id")
                    .table(Leads::Table)
                    .col(Leads::DealershipId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_easycars_lead_number")
                    .table(Leads::Table)
                    .col(Leads::EasycarsLeadNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_leads_easycars_lead_number")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_leads_dealership_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
    DealershipId,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    VehicleId,
    Status,
    EasycarsLeadNumber,
    EasycarsCustomerNo,
    LastKnownEasycarsStatus,
    StatusSyncedAt,
    SyncedAt,
    FinanceInterested,
    Rating,
    RawPayload,
    CreatedAt,
    UpdatedAt,
}
