//! Lead synchronization
//!
//! Four flows share this orchestrator: outbound create/update of a single
//! lead, inbound bulk refresh of linked leads, outbound status-only push,
//! and inbound status reconciliation with conflict handling.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::counter;
use sea_orm::Set;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::easycars::types::{LeadStatusRequest, LeadUpsertRequest};
use crate::easycars::{ApiClient, DealerApiCredentials, EasyCarsError};
use crate::models::lead;
use crate::repositories::{
    CredentialRepository, LeadRepository, SyncLogRepository, VehicleRepository,
};

use super::conflict::ConflictResolver;
use super::status::LeadStatus;
use super::{SyncError, SyncReport, SyncType};

/// Drives the lead flows for one dealership.
pub struct LeadSyncOrchestrator {
    credentials: CredentialRepository,
    leads: LeadRepository,
    vehicles: VehicleRepository,
    sync_logs: SyncLogRepository,
    client: Arc<ApiClient>,
    resolver: ConflictResolver,
}

impl LeadSyncOrchestrator {
    pub fn new(
        credentials: CredentialRepository,
        leads: LeadRepository,
        vehicles: VehicleRepository,
        sync_logs: SyncLogRepository,
        client: Arc<ApiClient>,
        resolver: ConflictResolver,
    ) -> Self {
        Self {
            credentials,
            leads,
            vehicles,
            sync_logs,
            client,
            resolver,
        }
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Push one lead to EasyCars: create when unlinked, update when linked.
    #[instrument(skip_all, fields(dealership_id = %dealership_id, lead_id = %lead_id))]
    pub async fn sync_lead_to_easycars(
        &self,
        dealership_id: Uuid,
        lead_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let credentials = self
            .resolve_credentials(dealership_id, SyncType::LeadOutbound, &started)
            .await?;

        let lead = self
            .leads
            .find_by_id(&dealership_id, &lead_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("lead {} not found", lead_id))?;

        let report = match self.push_lead(&credentials, lead, cancel).await {
            Ok(()) => SyncReport::from_batch(1, Vec::new(), started.elapsed().as_millis()),
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => SyncReport::from_batch(
                0,
                vec![format!("{}: {}", lead_id, e)],
                started.elapsed().as_millis(),
            ),
        };

        self.sync_logs
            .record(dealership_id, SyncType::LeadOutbound, &report)
            .await;
        Ok(report)
    }

    /// Bulk outbound push followed by an inbound refresh, one report.
    ///
    /// This is the flow the scheduler and the manual trigger run: unlinked
    /// leads are created remotely, stale linked leads are updated, then
    /// every linked lead's remote detail is mirrored back.
    #[instrument(skip_all, fields(dealership_id = %dealership_id))]
    pub async fn run_lead_sync(
        &self,
        dealership_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let credentials = self
            .resolve_credentials(dealership_id, SyncType::Lead, &started)
            .await?;

        let mut succeeded = 0usize;
        let mut errors = Vec::new();

        let mut outbound = self.leads.find_unlinked(&dealership_id).await?;
        outbound.extend(self.leads.find_stale_linked(&dealership_id).await?);

        for lead in outbound {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let lead_id = lead.id;
            match self.push_lead(&credentials, lead, cancel).await {
                Ok(()) => succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => errors.push(format!("{}: {}", lead_id, e)),
            }
        }

        for lead in self.leads.find_linked(&dealership_id).await? {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let lead_id = lead.id;
            match self.pull_lead(&credentials, lead, cancel).await {
                Ok(()) => succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => errors.push(format!("{}: {}", lead_id, e)),
            }
        }

        let report = SyncReport::from_batch(succeeded, errors, started.elapsed().as_millis());
        counter!("lead_sync_runs_total", "status" => report.status.as_str()).increment(1);
        info!(
            processed = report.items_processed,
            succeeded = report.items_succeeded,
            failed = report.items_failed,
            status = report.status.as_str(),
            "lead sync finished"
        );
        self.sync_logs
            .record(dealership_id, SyncType::Lead, &report)
            .await;
        Ok(report)
    }

    /// Refresh every linked lead from its current remote detail.
    #[instrument(skip_all, fields(dealership_id = %dealership_id))]
    pub async fn sync_leads_from_easycars(
        &self,
        dealership_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let credentials = self
            .resolve_credentials(dealership_id, SyncType::Lead, &started)
            .await?;

        let mut succeeded = 0usize;
        let mut errors = Vec::new();

        for lead in self.leads.find_linked(&dealership_id).await? {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let lead_id = lead.id;
            match self.pull_lead(&credentials, lead, cancel).await {
                Ok(()) => succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => errors.push(format!("{}: {}", lead_id, e)),
            }
        }

        let report = SyncReport::from_batch(succeeded, errors, started.elapsed().as_millis());
        self.sync_logs
            .record(dealership_id, SyncType::Lead, &report)
            .await;
        Ok(report)
    }

    /// Push only the status of one linked lead.
    #[instrument(skip_all, fields(dealership_id = %dealership_id, lead_id = %lead_id))]
    pub async fn sync_lead_status_to_easycars(
        &self,
        dealership_id: Uuid,
        lead_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let credentials = self
            .resolve_credentials(dealership_id, SyncType::LeadStatusOutbound, &started)
            .await?;

        let lead = self
            .leads
            .find_by_id(&dealership_id, &lead_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("lead {} not found", lead_id))?;

        let report = match self.push_status(&credentials, lead, cancel).await {
            Ok(()) => SyncReport::from_batch(1, Vec::new(), started.elapsed().as_millis()),
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => SyncReport::from_batch(
                0,
                vec![format!("{}: {}", lead_id, e)],
                started.elapsed().as_millis(),
            ),
        };

        self.sync_logs
            .record(dealership_id, SyncType::LeadStatusOutbound, &report)
            .await;
        Ok(report)
    }

    /// Compare every linked lead's status against the remote one and hand
    /// divergences to the conflict resolver.
    #[instrument(skip_all, fields(dealership_id = %dealership_id))]
    pub async fn sync_lead_statuses_from_easycars(
        &self,
        dealership_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let credentials = self
            .resolve_credentials(dealership_id, SyncType::LeadStatus, &started)
            .await?;

        let mut succeeded = 0usize;
        let mut errors = Vec::new();

        for lead in self.leads.find_linked(&dealership_id).await? {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let lead_id = lead.id;
            match self.reconcile_status(&credentials, lead, cancel).await {
                Ok(()) => succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => errors.push(format!("{}: {}", lead_id, e)),
            }
        }

        let report = SyncReport::from_batch(succeeded, errors, started.elapsed().as_millis());
        self.sync_logs
            .record(dealership_id, SyncType::LeadStatus, &report)
            .await;
        Ok(report)
    }

    /// Load and decrypt the active credential, logging a failed run when
    /// the dealership has none.
    async fn resolve_credentials(
        &self,
        dealership_id: Uuid,
        sync_type: SyncType,
        started: &Instant,
    ) -> Result<DealerApiCredentials, SyncError> {
        let Some(row) = self.credentials.find_active(&dealership_id).await? else {
            let report = SyncReport::failed(
                "no active EasyCars credential".to_string(),
                started.elapsed().as_millis(),
            );
            self.sync_logs.record(dealership_id, sync_type, &report).await;
            return Err(SyncError::NotConfigured);
        };
        Ok(self.credentials.decrypt(&row)?)
    }

    /// Create or update one lead remotely and stamp the local row.
    async fn push_lead(
        &self,
        credentials: &DealerApiCredentials,
        lead: lead::Model,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let request = self.build_upsert_request(&lead).await?;

        if lead.easycars_lead_number.is_none() {
            let response = self.client.create_lead(credentials, &request, cancel).await?;
            let lead_number = response.lead_number.ok_or_else(|| {
                SyncError::Api(EasyCarsError::Transport(
                    "create response carried no lead number".to_string(),
                ))
            })?;
            self.leads
                .mark_linked(lead, &lead_number, response.customer_no.as_deref())
                .await?;
        } else {
            self.client.update_lead(credentials, &request, cancel).await?;
            self.leads.mark_synced(lead).await?;
        }

        Ok(())
    }

    /// Mirror the current remote detail onto one linked lead.
    async fn pull_lead(
        &self,
        credentials: &DealerApiCredentials,
        lead: lead::Model,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let lead_number = lead
            .easycars_lead_number
            .clone()
            .ok_or_else(|| anyhow::anyhow!("lead {} is not linked", lead.id))?;

        let detail = self
            .client
            .get_lead_detail(credentials, &lead_number, cancel)
            .await?;

        let now = Utc::now().fixed_offset();
        let mut active: lead::ActiveModel = lead.into();
        if let Some(name) = detail.customer_name.clone().filter(|n| !n.is_empty()) {
            active.customer_name = Set(name);
        }
        if detail.email.is_some() {
            active.customer_email = Set(detail.email.clone());
        }
        if detail.phone.is_some() {
            active.customer_phone = Set(detail.phone.clone());
        }
        if let Some(finance) = detail.finance_interested {
            active.finance_interested = Set(finance);
        }
        if detail.rating.is_some() {
            active.rating = Set(detail.rating.clone());
        }
        if let Some(customer_no) = detail.customer_no.clone() {
            active.easycars_customer_no = Set(Some(customer_no));
        }
        if let Some(code) = detail.status {
            if !LeadStatus::is_known_remote_code(code) {
                warn!(lead_number = %lead_number, code, "unknown remote status code");
            }
            active.status = Set(LeadStatus::from_remote_code(code).as_str().to_string());
            active.last_known_easycars_status = Set(Some(code));
            active.status_synced_at = Set(Some(now));
        }
        active.raw_payload = Set(Some(serde_json::json!(detail)));
        active.updated_at = Set(now);
        // The refresh itself counts as a completed sync.
        active.synced_at = Set(Some(now));
        self.leads.update(active).await?;

        Ok(())
    }

    /// Push only the status code of one linked lead.
    async fn push_status(
        &self,
        credentials: &DealerApiCredentials,
        lead: lead::Model,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let lead_number = lead
            .easycars_lead_number
            .clone()
            .ok_or_else(|| anyhow::anyhow!("lead {} is not linked", lead.id))?;

        let code = LeadStatus::from_db(&lead.status).to_remote_code();
        let request = LeadStatusRequest {
            lead_number,
            status: code,
        };
        self.client
            .update_lead_status(credentials, &request, cancel)
            .await?;

        let now = Utc::now().fixed_offset();
        let mut active: lead::ActiveModel = lead.into();
        active.last_known_easycars_status = Set(Some(code));
        active.status_synced_at = Set(Some(now));
        active.updated_at = Set(now);
        self.leads.update(active).await?;

        Ok(())
    }

    /// Compare one lead's status with the remote one.
    async fn reconcile_status(
        &self,
        credentials: &DealerApiCredentials,
        lead: lead::Model,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let lead_number = lead
            .easycars_lead_number
            .clone()
            .ok_or_else(|| anyhow::anyhow!("lead {} is not linked", lead.id))?;

        let detail = self
            .client
            .get_lead_detail(credentials, &lead_number, cancel)
            .await?;
        let remote_code = detail
            .status
            .ok_or_else(|| anyhow::anyhow!("remote detail carried no status"))?;

        if !LeadStatus::is_known_remote_code(remote_code) {
            warn!(lead_number = %lead_number, remote_code, "unknown remote status code");
        }

        let local = LeadStatus::from_db(&lead.status);
        if local.to_remote_code() == remote_code {
            // In agreement; just record the observation.
            let now = Utc::now().fixed_offset();
            let mut active: lead::ActiveModel = lead.into();
            active.last_known_easycars_status = Set(Some(remote_code));
            active.status_synced_at = Set(Some(now));
            self.leads.update(active).await?;
            return Ok(());
        }

        self.resolver
            .handle_divergence(&lead, remote_code)
            .await
            .map_err(SyncError::Db)?;
        Ok(())
    }

    /// Assemble the outbound payload for a lead, joining in the vehicle of
    /// interest when one is linked.
    async fn build_upsert_request(
        &self,
        lead: &lead::Model,
    ) -> Result<LeadUpsertRequest, SyncError> {
        let vehicle = match lead.vehicle_id {
            Some(vehicle_id) => {
                self.vehicles
                    .find_by_id(&lead.dealership_id, &vehicle_id)
                    .await?
            }
            None => None,
        };

        let (vehicle_stock_number, vehicle_description) = match vehicle {
            Some(v) => (
                v.stock_number.clone(),
                Some(format!("{} {} {}", v.year, v.make, v.model)),
            ),
            None => (None, None),
        };

        Ok(LeadUpsertRequest {
            lead_number: lead.easycars_lead_number.clone(),
            customer_name: lead.customer_name.clone(),
            email: lead.customer_email.clone(),
            phone: lead.customer_phone.clone(),
            vehicle_stock_number,
            vehicle_description,
            finance_interested: lead.finance_interested,
            status: LeadStatus::from_db(&lead.status).to_remote_code(),
        })
    }
}
