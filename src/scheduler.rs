//! Background sync scheduler
//!
//! A single tick loop wakes up on a fixed interval, checks every dealership
//! with an active credential against its per-flow cadence, and fans the due
//! syncs out under a concurrency bound. Jitter on the due check keeps a
//! fleet of dealerships from firing at the same instant after a restart.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::repositories::{CredentialRepository, SyncLogRepository};
use crate::sync::{LeadSyncOrchestrator, StockSyncOrchestrator, SyncError, SyncType};

/// Periodic driver for the stock and lead flows across all dealerships.
pub struct Scheduler {
    config: SchedulerConfig,
    credentials: CredentialRepository,
    sync_logs: SyncLogRepository,
    stock: Arc<StockSyncOrchestrator>,
    leads: Arc<LeadSyncOrchestrator>,
    dealership_slots: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        credentials: CredentialRepository,
        sync_logs: SyncLogRepository,
        stock: Arc<StockSyncOrchestrator>,
        leads: Arc<LeadSyncOrchestrator>,
    ) -> Self {
        let dealership_slots = Arc::new(Semaphore::new(config.max_concurrent_dealerships));
        Self {
            config,
            credentials,
            sync_logs,
            stock,
            leads,
            dealership_slots,
        }
    }

    /// Run the tick loop until the token is cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(self.config.tick_interval_seconds));
        // The first tick fires immediately; skip it so startup load settles
        // before the first full sweep.
        ticker.tick().await;

        info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            max_concurrent_dealerships = self.config.max_concurrent_dealerships,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.clone().tick(&cancel).await;
                }
            }
        }
    }

    /// One sweep over all dealerships with active credentials.
    #[instrument(skip_all)]
    async fn tick(self: Arc<Self>, cancel: &CancellationToken) {
        let credentials = match self.credentials.list_active().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("failed to list active credentials: {}", e);
                return;
            }
        };

        let mut handles = Vec::with_capacity(credentials.len());
        for credential in credentials {
            if cancel.is_cancelled() {
                break;
            }

            let permit = match self.dealership_slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let scheduler = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                scheduler
                    .run_due_syncs(credential.dealership_id, &cancel)
                    .await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("scheduled sync task panicked: {}", e);
            }
        }
    }

    /// Run whichever flows are due for one dealership.
    async fn run_due_syncs(&self, dealership_id: Uuid, cancel: &CancellationToken) {
        if self
            .is_due(dealership_id, SyncType::Stock, self.config.stock_interval_seconds)
            .await
        {
            match self.stock.sync_stock(dealership_id, cancel).await {
                Ok(report) => debug!(
                    dealership_id = %dealership_id,
                    status = report.status.as_str(),
                    "scheduled stock sync finished"
                ),
                Err(SyncError::Cancelled) => return,
                Err(e) => warn!(dealership_id = %dealership_id, "scheduled stock sync failed: {}", e),
            }
        }

        if cancel.is_cancelled() {
            return;
        }

        if self
            .is_due(dealership_id, SyncType::Lead, self.config.lead_interval_seconds)
            .await
        {
            match self.leads.run_lead_sync(dealership_id, cancel).await {
                Ok(report) => debug!(
                    dealership_id = %dealership_id,
                    status = report.status.as_str(),
                    "scheduled lead sync finished"
                ),
                Err(SyncError::Cancelled) => return,
                Err(e) => warn!(dealership_id = %dealership_id, "scheduled lead sync failed: {}", e),
            }

            if cancel.is_cancelled() {
                return;
            }

            match self
                .leads
                .sync_lead_statuses_from_easycars(dealership_id, cancel)
                .await
            {
                Ok(report) => debug!(
                    dealership_id = %dealership_id,
                    status = report.status.as_str(),
                    "scheduled status reconciliation finished"
                ),
                Err(SyncError::Cancelled) => {}
                Err(e) => warn!(
                    dealership_id = %dealership_id,
                    "scheduled status reconciliation failed: {}",
                    e
                ),
            }
        }
    }

    /// A flow is due when its last run is older than the configured
    /// interval, stretched by a random jitter fraction.
    async fn is_due(&self, dealership_id: Uuid, sync_type: SyncType, interval_seconds: u64) -> bool {
        let latest = match self.sync_logs.latest(&dealership_id, Some(sync_type)).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(dealership_id = %dealership_id, "failed to read sync history: {}", e);
                return false;
            }
        };

        let Some(latest) = latest else {
            return true;
        };

        let jitter = rand::thread_rng().gen_range(0.0..=self.config.jitter_pct_max);
        let effective = (interval_seconds as f64 * (1.0 + jitter)) as i64;
        let elapsed = Utc::now()
            .signed_duration_since(latest.created_at.with_timezone(&Utc))
            .num_seconds();
        elapsed >= effective
    }
}
