//! Conflict resolution for diverging lead statuses
//!
//! When reconciliation finds the remote status differing from the local
//! one, the configured strategy decides what happens: keep local, adopt
//! remote (transition rules permitting), or park the divergence for an
//! operator.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::Set;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{lead, lead_status_conflict};
use crate::repositories::{ConflictRepository, LeadRepository};

use super::status::LeadStatus;

/// How an observed local/remote divergence is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    /// Local state is authoritative; the divergence is logged and ignored.
    LocalWins,
    /// Remote state is adopted when the transition is legal; otherwise a
    /// conflict is recorded instead of forcing it.
    RemoteWins,
    /// Every divergence is recorded for an operator.
    ManualReview,
}

impl ConflictStrategy {
    /// Parse the configured strategy name, defaulting to manual review.
    pub fn from_config(value: &str) -> Self {
        match value {
            "local_wins" => ConflictStrategy::LocalWins,
            "remote_wins" => ConflictStrategy::RemoteWins,
            _ => ConflictStrategy::ManualReview,
        }
    }
}

/// Operator's decision when closing a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Local,
    Remote,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Local => "local",
            Resolution::Remote => "remote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Resolution::Local),
            "remote" => Some(Resolution::Remote),
            _ => None,
        }
    }
}

/// What handling a divergence actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceOutcome {
    LocalKept,
    RemoteApplied(LeadStatus),
    ConflictRecorded,
}

/// Applies the configured strategy to observed divergences and executes
/// operator resolutions.
#[derive(Clone)]
pub struct ConflictResolver {
    strategy: ConflictStrategy,
    conflicts: ConflictRepository,
    leads: LeadRepository,
}

impl ConflictResolver {
    pub fn new(
        strategy: ConflictStrategy,
        conflicts: ConflictRepository,
        leads: LeadRepository,
    ) -> Self {
        Self {
            strategy,
            conflicts,
            leads,
        }
    }

    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Handle a local/remote status divergence for one lead.
    pub async fn handle_divergence(
        &self,
        lead: &lead::Model,
        remote_code: i32,
    ) -> Result<DivergenceOutcome> {
        let local = LeadStatus::from_db(&lead.status);
        let remote = LeadStatus::from_remote_code(remote_code);
        let remote_lead_number = lead
            .easycars_lead_number
            .as_deref()
            .ok_or_else(|| anyhow!("lead {} is not linked", lead.id))?;

        match self.strategy {
            ConflictStrategy::LocalWins => {
                info!(
                    lead_id = %lead.id,
                    local = local.as_str(),
                    remote_code,
                    "status divergence ignored, local wins"
                );
                Ok(DivergenceOutcome::LocalKept)
            }
            ConflictStrategy::RemoteWins => {
                if local.can_transition_to(remote) {
                    self.apply_remote_status(lead.clone(), remote, remote_code)
                        .await?;
                    Ok(DivergenceOutcome::RemoteApplied(remote))
                } else {
                    warn!(
                        lead_id = %lead.id,
                        local = local.as_str(),
                        remote = remote.as_str(),
                        "illegal remote transition, recording conflict"
                    );
                    self.conflicts
                        .upsert_open(
                            lead.dealership_id,
                            lead.id,
                            remote_lead_number,
                            local.as_str(),
                            remote_code,
                        )
                        .await?;
                    Ok(DivergenceOutcome::ConflictRecorded)
                }
            }
            ConflictStrategy::ManualReview => {
                self.conflicts
                    .upsert_open(
                        lead.dealership_id,
                        lead.id,
                        remote_lead_number,
                        local.as_str(),
                        remote_code,
                    )
                    .await?;
                Ok(DivergenceOutcome::ConflictRecorded)
            }
        }
    }

    /// Close a conflict with the operator's decision. Choosing remote
    /// applies the remote status if the transition is legal at resolution
    /// time; an illegal transition still closes the conflict but leaves the
    /// lead untouched.
    pub async fn resolve(
        &self,
        dealership_id: &Uuid,
        conflict: lead_status_conflict::Model,
        resolution: Resolution,
        resolved_by: &str,
    ) -> Result<lead_status_conflict::Model> {
        if resolution == Resolution::Remote {
            let lead = self
                .leads
                .find_by_id(dealership_id, &conflict.lead_id)
                .await?
                .ok_or_else(|| anyhow!("lead {} not found", conflict.lead_id))?;
            let local = LeadStatus::from_db(&lead.status);
            let remote = LeadStatus::from_remote_code(conflict.remote_status_code);

            if local.can_transition_to(remote) {
                self.apply_remote_status(lead, remote, conflict.remote_status_code)
                    .await?;
            } else {
                warn!(
                    lead_id = %conflict.lead_id,
                    local = local.as_str(),
                    remote = remote.as_str(),
                    "remote resolution chosen but transition is no longer legal"
                );
            }
        }

        self.conflicts
            .resolve(conflict, resolution.as_str(), resolved_by)
            .await
    }

    async fn apply_remote_status(
        &self,
        lead: lead::Model,
        remote: LeadStatus,
        remote_code: i32,
    ) -> Result<lead::Model> {
        let now = Utc::now().fixed_offset();
        let mut active: lead::ActiveModel = lead.into();
        active.status = Set(remote.as_str().to_string());
        active.last_known_easycars_status = Set(Some(remote_code));
        active.status_synced_at = Set(Some(now));
        active.updated_at = Set(now);
        self.leads.update(active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            ConflictStrategy::from_config("local_wins"),
            ConflictStrategy::LocalWins
        );
        assert_eq!(
            ConflictStrategy::from_config("remote_wins"),
            ConflictStrategy::RemoteWins
        );
        assert_eq!(
            ConflictStrategy::from_config("manual_review"),
            ConflictStrategy::ManualReview
        );
        assert_eq!(
            ConflictStrategy::from_config("anything else"),
            ConflictStrategy::ManualReview
        );
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!(Resolution::parse("local"), Some(Resolution::Local));
        assert_eq!(Resolution::parse("remote"), Some(Resolution::Remote));
        assert_eq!(Resolution::parse("both"), None);
    }
}
