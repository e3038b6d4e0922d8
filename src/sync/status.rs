//! Lead status model
//!
//! The local status enum, the fixed translation table to EasyCars status
//! codes, and the transition rules that gate remote-driven changes.

use serde::{Deserialize, Serialize};

/// Remote status codes used by EasyCars.
pub const REMOTE_RECEIVED: i32 = 10;
pub const REMOTE_IN_PROGRESS: i32 = 30;
pub const REMOTE_WON: i32 = 50;
pub const REMOTE_LOST: i32 = 60;
pub const REMOTE_DELETED: i32 = 90;

/// Local lead status.
///
/// `Done` is a legacy value still present on old rows; it maps to the
/// remote Won code on the way out and is never produced by inbound
/// translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Received,
    InProgress,
    Won,
    Lost,
    Deleted,
    Done,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Received => "received",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
            LeadStatus::Deleted => "deleted",
            LeadStatus::Done => "done",
        }
    }

    /// Parse the persisted status string. Unrecognized values fall back to
    /// Received so a bad row degrades instead of wedging the sync.
    pub fn from_db(value: &str) -> Self {
        match value {
            "in_progress" => LeadStatus::InProgress,
            "won" => LeadStatus::Won,
            "lost" => LeadStatus::Lost,
            "deleted" => LeadStatus::Deleted,
            "done" => LeadStatus::Done,
            _ => LeadStatus::Received,
        }
    }

    /// Translate to the remote status code.
    pub fn to_remote_code(&self) -> i32 {
        match self {
            LeadStatus::Received => REMOTE_RECEIVED,
            LeadStatus::InProgress => REMOTE_IN_PROGRESS,
            LeadStatus::Won | LeadStatus::Done => REMOTE_WON,
            LeadStatus::Lost => REMOTE_LOST,
            LeadStatus::Deleted => REMOTE_DELETED,
        }
    }

    /// Translate a remote status code to the local enum. Unknown codes
    /// default to Received; callers log the code before discarding it.
    pub fn from_remote_code(code: i32) -> Self {
        match code {
            REMOTE_IN_PROGRESS => LeadStatus::InProgress,
            REMOTE_WON => LeadStatus::Won,
            REMOTE_LOST => LeadStatus::Lost,
            REMOTE_DELETED => LeadStatus::Deleted,
            _ => LeadStatus::Received,
        }
    }

    /// Whether a remote code is one of the documented values.
    pub fn is_known_remote_code(code: i32) -> bool {
        matches!(
            code,
            REMOTE_RECEIVED | REMOTE_IN_PROGRESS | REMOTE_WON | REMOTE_LOST | REMOTE_DELETED
        )
    }

    /// Whether a transition from `self` to `target` is legal.
    ///
    /// Deleted is terminal; Won, Lost and the legacy Done can only move to
    /// Deleted; the open statuses move freely among themselves and to any
    /// closing status. Same-status transitions are always legal.
    pub fn can_transition_to(&self, target: LeadStatus) -> bool {
        if *self == target {
            return true;
        }
        match self {
            LeadStatus::Deleted => false,
            LeadStatus::Won | LeadStatus::Lost | LeadStatus::Done => {
                target == LeadStatus::Deleted
            }
            LeadStatus::Received | LeadStatus::InProgress => true,
        }
    }
}
