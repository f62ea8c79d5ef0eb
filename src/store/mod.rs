use crate::domain::{CaseObservation, CaseTotals, RegionEntry, RegionRecord, UpsertOutcome};
use crate::error::Result;
use async_trait::async_trait;

#[cfg(feature = "db")]
pub mod database;
pub mod memory;

#[cfg(feature = "db")]
pub use database::TursoRegionStore;
pub use memory::MemoryRegionStore;

/// Minimal store surface required by the aggregation core.
///
/// Bulk upserts are unordered: every operation is attempted independently
/// and per-code outcomes come back as data. An `Err` from a bulk method
/// means the store itself was unreachable, not that some operations failed.
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Records whose code is in `codes`; unknown codes are omitted.
    async fn get_by_codes(&self, codes: &[String]) -> Result<Vec<RegionRecord>>;

    /// Case-insensitive substring match on `name`, ordered by code ascending.
    async fn find_by_name(&self, fragment: &str) -> Result<Vec<RegionRecord>>;

    /// Sum of active cases and newest observation stamp over regions that
    /// have received at least one ingestion update. `None` when no region
    /// qualifies.
    async fn aggregate_totals(&self) -> Result<Option<CaseTotals>>;

    /// Upserts counts and observation stamps, leaving names untouched.
    /// Observations older than the stored stamp are skipped as stale.
    async fn upsert_counts(&self, observations: &[CaseObservation]) -> Result<Vec<UpsertOutcome>>;

    /// Upserts canonical names, leaving counts and stamps untouched. A blank
    /// name is a per-entry failure so an established name is never erased.
    async fn upsert_names(&self, entries: &[RegionEntry]) -> Result<Vec<UpsertOutcome>>;
}
