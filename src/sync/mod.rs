//! Sync orchestration
//!
//! The orchestrators in this module drive the EasyCars flows end to end:
//! stock import, the four lead flows, and image download. Every run
//! produces a [`SyncReport`] and an append-only sync log row.

pub mod conflict;
pub mod images;
pub mod leads;
pub mod status;
pub mod stock;

use thiserror::Error;

use crate::easycars::EasyCarsError;

pub use conflict::{ConflictResolver, ConflictStrategy};
pub use images::{ImageSource, ImageStore, ImageSyncer};
pub use leads::LeadSyncOrchestrator;
pub use status::LeadStatus;
pub use stock::StockSyncOrchestrator;

/// Which flow a sync log row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    Stock,
    /// Composite bulk lead run: outbound pushes plus inbound refresh.
    Lead,
    /// Single outbound lead create/update.
    LeadOutbound,
    /// Bulk status reconciliation against the remote system.
    LeadStatus,
    /// Single outbound status push.
    LeadStatusOutbound,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Stock => "stock",
            SyncType::Lead => "lead",
            SyncType::LeadOutbound => "lead_outbound",
            SyncType::LeadStatus => "lead_status",
            SyncType::LeadStatusOutbound => "lead_status_outbound",
        }
    }
}

/// Outcome classification for one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::PartialSuccess => "partial_success",
            SyncStatus::Failed => "failed",
        }
    }
}

/// Aggregated result of one sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub items_processed: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub errors: Vec<String>,
    pub duration_ms: u128,
}

impl SyncReport {
    /// Classify a finished batch. An empty batch counts as success; a batch
    /// where everything failed is a failure; anything in between is partial.
    pub fn from_batch(succeeded: usize, errors: Vec<String>, duration_ms: u128) -> Self {
        let failed = errors.len();
        let processed = succeeded + failed;
        let status = if failed == 0 {
            SyncStatus::Success
        } else if succeeded == 0 {
            SyncStatus::Failed
        } else {
            SyncStatus::PartialSuccess
        };
        Self {
            status,
            items_processed: processed,
            items_succeeded: succeeded,
            items_failed: failed,
            errors,
            duration_ms,
        }
    }

    /// A whole-run failure before any item was attempted.
    pub fn failed(error: String, duration_ms: u128) -> Self {
        Self {
            status: SyncStatus::Failed,
            items_processed: 0,
            items_succeeded: 0,
            items_failed: 0,
            errors: vec![error],
            duration_ms,
        }
    }
}

/// Orchestrator-level sync failures.
///
/// Per-item failures never surface here; they are folded into the
/// [`SyncReport`]. These variants abort the run as a whole.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The dealership has no active credential.
    #[error("dealership has no active EasyCars credential")]
    NotConfigured,

    /// The run was cancelled by shutdown; completed item mutations are kept.
    #[error("sync cancelled")]
    Cancelled,

    /// A database operation outside an item boundary failed.
    #[error("database error during sync: {0}")]
    Db(#[from] anyhow::Error),

    /// The fetch-all call or another whole-run API call failed.
    #[error("EasyCars API error: {0}")]
    Api(EasyCarsError),
}

impl From<EasyCarsError> for SyncError {
    fn from(err: EasyCarsError) -> Self {
        match err {
            EasyCarsError::Cancelled => SyncError::Cancelled,
            other => SyncError::Api(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_is_success() {
        let report = SyncReport::from_batch(0, Vec::new(), 5);
        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.items_processed, 0);
    }

    #[test]
    fn test_all_failed_batch() {
        let report = SyncReport::from_batch(0, vec!["a".into(), "b".into()], 5);
        assert_eq!(report.status, SyncStatus::Failed);
        assert_eq!(report.items_failed, 2);
    }

    #[test]
    fn test_mixed_batch_is_partial() {
        let report = SyncReport::from_batch(8, vec!["x".into(), "y".into()], 5);
        assert_eq!(report.status, SyncStatus::PartialSuccess);
        assert_eq!(report.items_processed, 10);
        assert_eq!(report.items_succeeded, 8);
        assert_eq!(report.items_failed, 2);
    }

    #[test]
    fn test_cancelled_api_error_collapses_to_cancelled() {
        let err: SyncError = EasyCarsError::Cancelled.into();
        assert!(matches!(err, SyncError::Cancelled));

        let err: SyncError = EasyCarsError::Fatal("x".into()).into();
        assert!(matches!(err, SyncError::Api(_)));
    }
}
