//! Drains the durable queue against the enricher and the record store.
//!
//! One drain runs at a time. A drain requested while another is in flight is
//! coalesced: the active drain makes one more pass over the queue once its
//! current pass finishes, so tasks appended mid-drain are not stranded.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use anyhow::Result;

use crate::{
    connectivity::ConnectivityMonitor,
    enrichment::Enricher,
    models::{AqiCategory, EnrichmentTask, FieldPatch},
    queue::QueueStore,
    records::RecordStore,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Whether an attempted task leaves the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetirePolicy {
    /// Every attempted task is removed, even when its record patch failed.
    #[default]
    Always,
    /// Tasks whose record patch failed stay queued for the next drain.
    RetainOnPatchFailure,
}

impl RetirePolicy {
    pub fn retires(self, outcome: TaskOutcome) -> bool {
        match (self, outcome) {
            (RetirePolicy::RetainOnPatchFailure, TaskOutcome::PatchFailed) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Patched,
    /// Every lookup came back empty, so no write was made.
    NothingToPatch,
    PatchFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub passes: usize,
    pub attempted: usize,
    pub patched: usize,
    pub nothing_to_patch: usize,
    pub patch_failures: usize,
    pub retained: usize,
    /// Connectivity dropped before every task was attempted.
    pub interrupted: bool,
}

impl DrainReport {
    fn record(&mut self, outcome: TaskOutcome, retired: bool) {
        self.attempted += 1;
        match outcome {
            TaskOutcome::Patched => self.patched += 1,
            TaskOutcome::NothingToPatch => self.nothing_to_patch += 1,
            TaskOutcome::PatchFailed => self.patch_failures += 1,
        }
        if !retired {
            self.retained += 1;
        }
    }

    fn absorb(&mut self, pass: DrainReport) {
        self.passes += pass.passes;
        self.attempted += pass.attempted;
        self.patched += pass.patched;
        self.nothing_to_patch += pass.nothing_to_patch;
        self.patch_failures += pass.patch_failures;
        self.retained += pass.retained;
        self.interrupted |= pass.interrupted;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Not attempted because the monitor reports no connectivity.
    Offline,
    /// Folded into the drain already in flight.
    Coalesced,
    Completed(DrainReport),
}

struct ProcessorInner {
    store: QueueStore,
    enricher: Arc<dyn Enricher>,
    records: Arc<dyn RecordStore>,
    connectivity: ConnectivityMonitor,
    policy: RetirePolicy,
    draining: AtomicBool,
    rerun_requested: AtomicBool,
    verbose: bool,
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct QueueProcessor {
    inner: Arc<ProcessorInner>,
}

#[derive(Clone)]
pub struct WeakQueueProcessor {
    inner: Weak<ProcessorInner>,
}

impl WeakQueueProcessor {
    pub fn upgrade(&self) -> Option<QueueProcessor> {
        self.inner.upgrade().map(|inner| QueueProcessor { inner })
    }
}

impl QueueProcessor {
    pub fn new(
        store: QueueStore,
        enricher: Arc<dyn Enricher>,
        records: Arc<dyn RecordStore>,
        connectivity: ConnectivityMonitor,
        policy: RetirePolicy,
    ) -> Self {
        let verbose = std::env::var("TRIPSYNC_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            inner: Arc::new(ProcessorInner {
                store,
                enricher,
                records,
                connectivity,
                policy,
                draining: AtomicBool::new(false),
                rerun_requested: AtomicBool::new(false),
                verbose,
            }),
        }
    }

    pub fn policy(&self) -> RetirePolicy {
        self.inner.policy
    }

    /// Handle that does not keep the processor alive.
    pub fn downgrade(&self) -> WeakQueueProcessor {
        WeakQueueProcessor {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Attempt every queued task in FIFO order, then persist the queue without
    /// the retired ones. Queue storage errors propagate; lookup and record
    /// store failures do not.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        let inner = &self.inner;
        let mut report: Option<DrainReport> = None;

        loop {
            if !inner.connectivity.current_state() {
                return Ok(report.map_or(DrainOutcome::Offline, DrainOutcome::Completed));
            }

            if inner.draining.swap(true, Ordering::AcqRel) {
                inner.rerun_requested.store(true, Ordering::Release);
                return Ok(report.map_or(DrainOutcome::Coalesced, DrainOutcome::Completed));
            }

            let pass = {
                let _guard = DrainGuard(&inner.draining);
                inner.rerun_requested.store(false, Ordering::Release);
                self.drain_pass().await?
            };

            report.get_or_insert_with(DrainReport::default).absorb(pass);

            if !inner.rerun_requested.swap(false, Ordering::AcqRel) {
                break;
            }
            log_debug!("drain requested while busy; running another pass");
        }

        let report = report.unwrap_or_default();
        if report.attempted > 0 {
            log_info!(
                "drain finished: {} attempted, {} patched, {} empty, {} patch failures, {} retained",
                report.attempted,
                report.patched,
                report.nothing_to_patch,
                report.patch_failures,
                report.retained
            );
        }
        Ok(DrainOutcome::Completed(report))
    }

    async fn drain_pass(&self) -> Result<DrainReport> {
        let inner = &self.inner;
        let mut report = DrainReport {
            passes: 1,
            ..Default::default()
        };

        let queue = inner.store.load().await?;
        if queue.is_empty() {
            return Ok(report);
        }

        log_info!("processing {} queued enrichment tasks", queue.len());

        let mut processed = HashSet::new();
        for task in queue.iter() {
            if !inner.connectivity.current_state() {
                log_info!("connectivity lost mid-drain; leaving remaining tasks queued");
                report.interrupted = true;
                break;
            }

            let outcome = self.process_task(task).await;
            let retired = inner.policy.retires(outcome);
            if retired {
                processed.insert(task.task_id.clone());
            }
            report.record(outcome, retired);
        }

        inner.store.remove_processed(&processed).await?;
        Ok(report)
    }

    async fn process_task(&self, task: &EnrichmentTask) -> TaskOutcome {
        let inner = &self.inner;
        let result = inner.enricher.enrich(task.coordinates).await;

        let Some(patch) = FieldPatch::from_result(&result) else {
            log_info!("no metadata found for record {}; nothing to write", task.record_id);
            return TaskOutcome::NothingToPatch;
        };

        match inner.records.patch_fields(&task.record_id, &patch).await {
            Ok(()) => {
                if inner.verbose {
                    log_info!(
                        "enriched record {} with {:?} (air quality: {})",
                        task.record_id,
                        patch,
                        patch
                            .aqi
                            .map(|aqi| AqiCategory::from_index(aqi).as_str())
                            .unwrap_or("unknown")
                    );
                } else {
                    log_debug!("enriched record {} with {:?}", task.record_id, patch);
                }
                TaskOutcome::Patched
            }
            Err(err) => {
                log_error!("failed to write enrichment for record {}: {err:#}", task.record_id);
                TaskOutcome::PatchFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_retires_everything() {
        let policy = RetirePolicy::default();
        assert!(policy.retires(TaskOutcome::Patched));
        assert!(policy.retires(TaskOutcome::NothingToPatch));
        assert!(policy.retires(TaskOutcome::PatchFailed));
    }

    #[test]
    fn retain_policy_keeps_only_failed_patches() {
        let policy = RetirePolicy::RetainOnPatchFailure;
        assert!(policy.retires(TaskOutcome::Patched));
        assert!(policy.retires(TaskOutcome::NothingToPatch));
        assert!(!policy.retires(TaskOutcome::PatchFailed));
    }

    #[test]
    fn report_counts_outcomes() {
        let mut report = DrainReport::default();
        report.record(TaskOutcome::Patched, true);
        report.record(TaskOutcome::PatchFailed, false);
        report.record(TaskOutcome::NothingToPatch, true);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.patched, 1);
        assert_eq!(report.patch_failures, 1);
        assert_eq!(report.nothing_to_patch, 1);
        assert_eq!(report.retained, 1);
    }
}
