use crate::domain::{CountryAggregate, RegionRecord};
use crate::error::{Result, TrackerError};
use crate::metrics::QueryMetrics;
use crate::store::RegionStore;
use std::sync::Arc;

/// Read-side accessors over the persisted records. Queries go straight to
/// the store; the reconciliation layer is not involved.
pub struct QueryService {
    store: Arc<dyn RegionStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self { store }
    }

    /// Records for the given codes. Codes with no record are silently
    /// omitted, so the result may be shorter than the input.
    pub async fn get_by_codes(&self, codes: &[String]) -> Result<Vec<RegionRecord>> {
        QueryMetrics::record_lookup("by_codes");
        self.store.get_by_codes(codes).await
    }

    /// Case-insensitive substring lookup on region name. When several regions
    /// match, the one with the smallest code wins so repeated queries are
    /// deterministic.
    pub async fn get_by_name(&self, fragment: &str) -> Result<RegionRecord> {
        QueryMetrics::record_lookup("by_name");
        let matches = self.store.find_by_name(fragment).await?;
        matches
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::NotFound(format!("could not find region: {fragment}")))
    }

    /// Country-wide rollup over every region that has received an ingestion
    /// update. The -1 sentinel aggregate means "no data yet", not zero cases.
    pub async fn country_total(&self) -> Result<CountryAggregate> {
        QueryMetrics::record_lookup("country_total");
        Ok(match self.store.aggregate_totals().await? {
            Some(totals) => CountryAggregate::from_totals(totals),
            None => CountryAggregate::no_data(),
        })
    }
}
