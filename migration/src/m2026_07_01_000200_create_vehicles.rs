//! Migration to create the vehicles table.
//!
//! Local inventory. The data_source column tags where each row came from so
//! the stock sync never overwrites vehicles owned by another origin.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vehicles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Vehicles::DealershipId).uuid().not_null())
                    .col(ColumnDef::new(Vehicles::Vin).text().null())
                    .col(ColumnDef::new(Vehicles::StockNumber).text().null())
                    .col(ColumnDef::new(Vehicles::Make).text().not_null())
                    .col(ColumnDef::new(Vehicles::Model).text().not_null())
                    .col(ColumnDef::new(Vehicles::Year).integer().not_null())
                    .col(ColumnDef::new(Vehicles::Price).double().not_null().default(0))
                    .col(
                        ColumnDef::new(Vehicles::Odometer)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Vehicles::Description).text().not_null())
                    .col(ColumnDef::new(Vehicles::Features).json_binary().null())
                    .col(ColumnDef::new(Vehicles::Images).json_binary().null())
                    .col(
                        ColumnDef::new(Vehicles::DataSource)
                            .text()
                            .not_null()
                            .default("manual"),
                    )
                    .col(
                        ColumnDef::new(Vehicles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Vehicles::UpdatedAt)
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
                    .name("idx_vehicles_dealership_id")
                    .table(Vehicles::Table)
                    .col(Vehicles::DealershipId)
                    .to_owned(),
            )
            .await?;

        // VIN lookup is the primary match key during stock sync
        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_vin")
                    .table(Vehicles::Table)
                    .col(Vehicles::Vin)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_dealership_stock_number")
                    .table(Vehicles::Table)
                    .col(Vehicles::DealershipId)
                    .col(Vehicles::StockNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_vehicles_dealership_stock_number")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_vehicles_vin").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_vehicles_dealership_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vehicles {
    Table,
    Id,
    DealershipId,
    Vin,
    StockNumber,
    Make,
    Model,
    Year,
    Price,
    Odometer,
    Description,
    Features,
    Images,
    DataSource,
    CreatedAt,
    UpdatedAt,
}
