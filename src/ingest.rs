use crate::error::Result;
use crate::metrics::IngestMetrics;
use crate::normalize::{normalize, SkippedEntry};
use crate::reconcile::{FailedUpsert, Reconciler};
use crate::registry;
use crate::store::RegionStore;
use crate::upstream::CaseFeed;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Operator-facing summary of one fetch-normalize-reconcile run. Failed codes
/// are listed individually so a follow-up trigger can target just those.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub regions_updated: usize,
    pub regions_stale: usize,
    pub failed: Vec<FailedUpsert>,
    pub skipped_entries: Vec<SkippedEntry>,
    pub registry_synced: usize,
}

/// One full ingestion cycle, triggered externally (on demand, not on a
/// schedule). Runs registry sync first so fresh records pick up canonical
/// names in the same trigger.
pub struct IngestCycle {
    feed: Arc<dyn CaseFeed>,
    store: Arc<dyn RegionStore>,
    reconciler: Reconciler,
    registry_path: PathBuf,
}

impl IngestCycle {
    pub fn new(feed: Arc<dyn CaseFeed>, store: Arc<dyn RegionStore>, registry_path: PathBuf) -> Self {
        let reconciler = Reconciler::new(store.clone());
        Self {
            feed,
            store,
            reconciler,
            registry_path,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<IngestReport> {
        let report = self.run_inner().await;
        if report.is_err() {
            IngestMetrics::record_cycle_error();
        }
        report
    }

    async fn run_inner(&self) -> Result<IngestReport> {
        let entries = registry::load_regions(&self.registry_path)?;
        let registry_report = registry::sync_registry(self.store.as_ref(), &entries).await?;
        for (code, reason) in &registry_report.failed {
            warn!("Registry sync failed for region {}: {}", code, reason);
        }

        let snapshot = self.feed.fetch_snapshot().await?;
        let normalized = normalize(&snapshot);
        let result = self.reconciler.reconcile(&normalized.observations).await?;

        IngestMetrics::record_cycle(
            result.updated,
            result.stale,
            result.failed.len(),
            normalized.skipped.len(),
        );

        let report = IngestReport {
            regions_updated: result.updated,
            regions_stale: result.stale,
            failed: result.failed,
            skipped_entries: normalized.skipped,
            registry_synced: registry_report.updated,
        };
        info!(
            updated = report.regions_updated,
            stale = report.regions_stale,
            failed = report.failed.len(),
            skipped = report.skipped_entries.len(),
            "Ingest cycle complete"
        );
        Ok(report)
    }
}
