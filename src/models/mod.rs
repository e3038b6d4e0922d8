//! # Data Models
//!
//! This module contains all the data models used throughout the EasyCars
//! sync service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod dealer_credential;
pub mod lead;
pub mod lead_status_conflict;
pub mod stock_raw_data;
pub mod sync_log;
pub mod vehicle;

pub use dealer_credential::Entity as DealerCredential;
pub use lead::Entity as Lead;
pub use lead_status_conflict::Entity as LeadStatusConflict;
pub use stock_raw_data::Entity as StockRawData;
pub use sync_log::Entity as SyncLog;
pub use vehicle::Entity as Vehicle;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "easycars-sync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
