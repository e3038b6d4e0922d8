//! Migration to create the stock_raw_data table.
//!
//! Stores the verbatim external payload for each vehicle, latest wins.
//! Kept purely for audit and debugging of mapping behavior.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockRawData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockRawData::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockRawData::DealershipId).uuid().not_null())
                    .col(ColumnDef::new(StockRawData::Vin).text().not_null())
                    .col(
                        ColumnDef::new(StockRawData::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockRawData::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert key: one raw payload row per (dealership, VIN)
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_raw_data_dealership_vin")
                    .table(StockRawData::Table)
                    .col(StockRawData::DealershipId)
                    .col(StockRawData::Vin)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_raw_data_dealership_vin")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(StockRawData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StockRawData {
    Table,
    Id,
    DealershipId,
    Vin,
    Payload,
    UpdatedAt,
}
