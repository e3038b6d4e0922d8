//! # EasyCars Sync Engine Library
//!
//! This library provides the core functionality for the EasyCars sync
//! service: credential storage, the external API client, the stock and lead
//! sync orchestrators, and the operational HTTP surface.

pub mod config;
pub mod crypto;
pub mod db;
pub mod easycars;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod sync;
pub use migration;
