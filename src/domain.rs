use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COUNTRY_CODE: &str = "IN";
pub const COUNTRY_NAME: &str = "India";

/// Canonical persisted entity: one document per administrative region,
/// keyed by its short code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub code: String,
    /// Canonical region name; empty until the registry pass backfills it.
    pub name: String,
    /// `None` until the first ingestion touches this region. A present value
    /// is exactly confirmed - recovered - deceased from the most recent
    /// applied snapshot and may be negative when upstream totals are
    /// inconsistent.
    pub active_cases: Option<i64>,
    /// Observation stamp of the applied snapshot; never regresses.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Country-wide rollup, derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryAggregate {
    pub code: String,
    pub name: String,
    pub active_cases: i64,
    pub last_updated: DateTime<Utc>,
}

impl CountryAggregate {
    /// "No data yet" marker: -1 cases stamped with the current time. Distinct
    /// from a zero-case aggregate.
    pub fn no_data() -> Self {
        Self {
            code: COUNTRY_CODE.to_string(),
            name: COUNTRY_NAME.to_string(),
            active_cases: -1,
            last_updated: Utc::now(),
        }
    }

    pub fn from_totals(totals: CaseTotals) -> Self {
        Self {
            code: COUNTRY_CODE.to_string(),
            name: COUNTRY_NAME.to_string(),
            active_cases: totals.active_cases,
            last_updated: totals.last_updated,
        }
    }
}

/// Grouped store aggregate: sum of active cases plus the newest observation
/// stamp among the regions that have one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaseTotals {
    pub active_cases: i64,
    pub last_updated: DateTime<Utc>,
}

/// One normalized upstream observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseObservation {
    pub code: String,
    pub active_cases: i64,
    pub observed_at: DateTime<Utc>,
}

/// One canonical registry entry from the reference dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionEntry {
    pub name: String,
    #[serde(rename = "state_code")]
    pub code: String,
}

/// Per-key result of one operation inside a bulk upsert. Failures are data,
/// not errors: one bad record must not abort the rest of the batch.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub code: String,
    pub result: std::result::Result<UpsertStatus, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    Created,
    Updated,
    /// Rejected by the staleness guard: the stored record already reflects a
    /// newer observation.
    Stale,
}

/// Region codes are 1-2 character identifiers.
pub fn validate_code(code: &str) -> std::result::Result<(), String> {
    if code.is_empty() || code.len() > 2 {
        return Err(format!("invalid region code: {code:?}"));
    }
    Ok(())
}
