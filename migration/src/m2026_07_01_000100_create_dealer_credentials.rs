//! Migration to create the dealer_credentials table.
//!
//! Stores one EasyCars connection secret set per dealership. Account and
//! client secrets are held as AES-256-GCM ciphertext, never plaintext.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DealerCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DealerCredentials::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::DealershipId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::AccountNumberCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::AccountSecretCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::ClientIdCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::ClientSecretCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::Environment)
                            .text()
                            .not_null()
                            .default("test"),
                    )
                    .col(ColumnDef::new(DealerCredentials::YardCode).text().null())
                    .col(
                        ColumnDef::new(DealerCredentials::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DealerCredentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One credential row per dealership
        manager
            .create_index(
                Index::create()
                    .name("idx_dealer_credentials_dealership_id")
                    .table(DealerCredentials::Table)
                    .col(DealerCredentials::DealershipId)
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
                    .name("idx_dealer_credentials_dealership_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DealerCredentials::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DealerCredentials {
    Table,
    Id,
    DealershipId,
    AccountNumberCiphertext,
    AccountSecretCiphertext,
    ClientIdCiphertext,
    ClientSecretCiphertext,
    Environment,
    YardCode,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
