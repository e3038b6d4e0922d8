//! EasyCars API boundary
//!
//! Everything that talks to the external dealer-management API lives here:
//! the error taxonomy derived from the vendor's response codes, the wire
//! DTOs, the process-wide token cache, and the retrying client.

pub mod client;
pub mod error;
pub mod token;
pub mod types;

pub use client::{ApiClient, DealerApiCredentials, HttpTransport, Transport, TransportRequest};
pub use error::EasyCarsError;
pub use token::TokenCache;
pub use types::Environment;
