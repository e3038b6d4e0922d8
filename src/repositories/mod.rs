//! Repository layer
//!
//! Each repository wraps SeaORM operations for one table behind
//! dealership-scoped methods. Handlers and sync orchestrators never touch
//! entities directly.

pub mod conflict;
pub mod credential;
pub mod lead;
pub mod stock_raw;
pub mod sync_log;
pub mod vehicle;

pub use conflict::ConflictRepository;
pub use credential::{CredentialRepository, NewCredential};
pub use lead::LeadRepository;
pub use stock_raw::StockRawRepository;
pub use sync_log::SyncLogRepository;
pub use vehicle::VehicleRepository;
