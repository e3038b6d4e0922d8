//! Database migrations for the EasyCars sync engine.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_07_01_000100_create_dealer_credentials;
mod m2026_07_01_000200_create_vehicles;
mod m2026_07_01_000300_create_leads;
mod m2026_07_01_000400_create_sync_logs;
mod m2026_07_01_000500_create_lead_status_conflicts;
mod m2026_07_01_000600_create_stock_raw_data;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_07_01_000100_create_dealer_credentials::Migration),
            Box::new(m2026_07_01_000200_create_vehicles::Migration),
            Box::new(m2026_07_01_000300_create_leads::Migration),
            Box::new(m2026_07_01_000400_create_sync_logs::Migration),
            Box::new(m2026_07_01_000500_create_lead_status_conflicts::Migration),
            Box::new(m2026_07_01_000600_create_stock_raw_data::Migration),
        ]
    }
}
