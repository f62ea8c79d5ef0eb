use crate::domain::{CaseObservation, UpsertStatus};
use crate::error::Result;
use crate::store::RegionStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-code failure inside an otherwise successful reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct FailedUpsert {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ReconciliationResult {
    /// Records created or overwritten this pass.
    pub updated: usize,
    /// Observations skipped because the store already held a newer one.
    pub stale: usize,
    /// Codes whose upsert failed, with the store's reason. The caller decides
    /// whether partial failure is acceptable and what to retry.
    pub failed: Vec<FailedUpsert>,
}

/// Merges normalized observations into the persisted canonical records.
pub struct Reconciler {
    store: Arc<dyn RegionStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self { store }
    }

    /// Submits every observation as one independent upsert in a single
    /// unordered batch. A code never seen before becomes a new record with an
    /// empty name for the registry pass to backfill; a failing record never
    /// aborts the rest.
    pub async fn reconcile(&self, observations: &[CaseObservation]) -> Result<ReconciliationResult> {
        if observations.is_empty() {
            debug!("Nothing to reconcile");
            return Ok(ReconciliationResult::default());
        }

        let outcomes = self.store.upsert_counts(observations).await?;

        let mut result = ReconciliationResult::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(UpsertStatus::Created) | Ok(UpsertStatus::Updated) => result.updated += 1,
                Ok(UpsertStatus::Stale) => result.stale += 1,
                Err(reason) => {
                    warn!("Upsert failed for region {}: {}", outcome.code, reason);
                    result.failed.push(FailedUpsert {
                        code: outcome.code,
                        reason,
                    });
                }
            }
        }

        info!(
            updated = result.updated,
            stale = result.stale,
            failed = result.failed.len(),
            "Reconciliation pass complete"
        );
        Ok(result)
    }
}
