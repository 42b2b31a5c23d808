use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::{runtime::Handle, sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    connectivity::{watch_reachability, ConnectivityMonitor},
    db::Database,
    enrichment::{Enricher, EnrichmentClient},
    models::{Coordinates, EnrichmentTask},
    queue::QueueStore,
    records::{FirestoreRecordStore, RecordStore},
    settings::SyncSettings,
};

use super::{DrainOutcome, QueueProcessor, RetirePolicy, WeakQueueProcessor};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Connectivity and backlog, for the offline banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub pending: usize,
}

struct ReachabilityCheck {
    http: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
}

/// Owns the queue, the processor and the reachability check for one client.
#[derive(Clone)]
pub struct SyncController {
    store: QueueStore,
    processor: QueueProcessor,
    connectivity: ConnectivityMonitor,
    reachability: Option<Arc<ReachabilityCheck>>,
    background: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SyncController {
    /// Production wiring: public lookups, Firestore, and an HTTP reachability check.
    pub fn new(db: Database, settings: &SyncSettings) -> Result<Self> {
        let enricher = EnrichmentClient::new(settings)?;

        let http = reqwest::Client::builder()
            .timeout(settings.lookup_timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .context("failed to create HTTP client")?;
        let records = FirestoreRecordStore::new(http.clone(), settings.firestore.clone());

        let mut controller = Self::with_parts(
            QueueStore::new(db),
            Arc::new(enricher),
            Arc::new(records),
            ConnectivityMonitor::new(false),
            settings.retire_policy(),
        );
        controller.reachability = Some(Arc::new(ReachabilityCheck {
            http,
            url: settings.connectivity.check_url.clone(),
            interval: Duration::from_secs(settings.connectivity.check_interval_secs.max(1)),
            timeout: Duration::from_secs(settings.connectivity.check_timeout_secs.max(1)),
        }));
        Ok(controller)
    }

    /// Wire explicit collaborators. No reachability check runs; reachability comes from
    /// whoever calls [`ConnectivityMonitor::report`].
    pub fn with_parts(
        store: QueueStore,
        enricher: Arc<dyn Enricher>,
        records: Arc<dyn RecordStore>,
        connectivity: ConnectivityMonitor,
        policy: RetirePolicy,
    ) -> Self {
        let processor = QueueProcessor::new(
            store.clone(),
            enricher,
            records,
            connectivity.clone(),
            policy,
        );

        let controller = Self {
            store,
            processor,
            connectivity,
            reachability: None,
            background: Arc::new(Mutex::new(Vec::new())),
        };

        let on_online = controller.clone_for_trigger();
        controller.connectivity.on_became_online(move || {
            on_online.trigger_drain("connectivity restored");
        });

        controller
    }

    fn clone_for_trigger(&self) -> DrainTrigger {
        DrainTrigger {
            processor: self.processor.downgrade(),
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn processor(&self) -> &QueueProcessor {
        &self.processor
    }

    pub fn queue(&self) -> &QueueStore {
        &self.store
    }

    /// Load the persisted queue, start the reachability check, and drain once if online.
    pub async fn start(&self, cancel_token: CancellationToken) -> Result<()> {
        let recovered = self
            .store
            .load()
            .await
            .context("failed to load pending enrichment queue")?;
        if !recovered.is_empty() {
            log_warn!(
                "recovered {} pending enrichment tasks from a previous run",
                recovered.len()
            );
        }

        if let Some(check) = &self.reachability {
            let handle = tokio::spawn(watch_reachability(
                self.connectivity.clone(),
                check.http.clone(),
                check.url.clone(),
                check.interval,
                check.timeout,
                cancel_token,
            ));
            self.background.lock().await.push(handle);
        }

        self.clone_for_trigger().trigger_drain("startup");
        Ok(())
    }

    /// Durably queue enrichment for a freshly saved trip update, then kick a
    /// drain if the network is up. Online and offline saves take this same
    /// path. An error means the enrichment intent was not recorded.
    pub async fn enqueue_update(
        &self,
        record_id: impl Into<String>,
        coordinates: Coordinates,
    ) -> Result<EnrichmentTask> {
        let task = self
            .store
            .enqueue(record_id, coordinates)
            .await
            .context("failed to queue trip update for enrichment")?;

        if self.connectivity.current_state() {
            self.clone_for_trigger().trigger_drain("new update");
        }
        Ok(task)
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            online: self.connectivity.current_state(),
            pending: self.store.snapshot().await.len(),
        }
    }

    /// Wait for the reachability check to stop after its cancellation token fired.
    pub async fn shutdown(&self) -> Result<()> {
        let handles: Vec<_> = self.background.lock().await.drain(..).collect();
        for handle in handles {
            handle.await.context("background task failed to join")?;
        }
        Ok(())
    }
}

/// Fire-and-forget drain spawner shared with connectivity listeners.
///
/// Holds the processor weakly so a listener registered on the monitor does not
/// keep the controller alive. Listeners may fire on threads outside the
/// runtime, so the runtime seen at construction is kept for spawning.
#[derive(Clone)]
struct DrainTrigger {
    processor: WeakQueueProcessor,
    runtime: Option<Handle>,
}

impl DrainTrigger {
    fn trigger_drain(&self, reason: &'static str) {
        let Some(processor) = self.processor.upgrade() else {
            return;
        };
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            log_warn!("no async runtime available; drain ({reason}) skipped");
            return;
        };

        runtime.spawn(async move {
            match processor.drain().await {
                Ok(DrainOutcome::Completed(_)) | Ok(DrainOutcome::Offline) => {}
                Ok(DrainOutcome::Coalesced) => {
                    log_info!("drain ({reason}) folded into the one already running")
                }
                Err(err) => log_error!("queue drain ({reason}) failed: {err:#}"),
            }
        });
    }
}
