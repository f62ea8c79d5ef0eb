use super::RegionStore;
use crate::domain::{
    validate_code, CaseObservation, CaseTotals, RegionEntry, RegionRecord, UpsertOutcome,
    UpsertStatus,
};
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use regex::RegexBuilder;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// In-memory store implementation for development/testing.
#[derive(Default)]
pub struct MemoryRegionStore {
    regions: Mutex<HashMap<String, RegionRecord>>,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    async fn get_by_codes(&self, codes: &[String]) -> Result<Vec<RegionRecord>> {
        let regions = self.regions.lock().unwrap();
        let mut records: Vec<RegionRecord> = regions
            .values()
            .filter(|r| codes.contains(&r.code))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(records)
    }

    async fn find_by_name(&self, fragment: &str) -> Result<Vec<RegionRecord>> {
        let matcher = RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(true)
            .build()
            .map_err(|e| TrackerError::Persistence(format!("invalid name pattern: {e}")))?;

        let regions = self.regions.lock().unwrap();
        let mut records: Vec<RegionRecord> = regions
            .values()
            .filter(|r| !r.name.is_empty() && matcher.is_match(&r.name))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(records)
    }

    async fn aggregate_totals(&self) -> Result<Option<CaseTotals>> {
        let regions = self.regions.lock().unwrap();
        let mut totals: Option<CaseTotals> = None;
        for record in regions.values() {
            let (Some(active), Some(stamp)) = (record.active_cases, record.last_updated) else {
                continue;
            };
            totals = Some(match totals {
                None => CaseTotals {
                    active_cases: active,
                    last_updated: stamp,
                },
                Some(t) => CaseTotals {
                    active_cases: t.active_cases + active,
                    last_updated: t.last_updated.max(stamp),
                },
            });
        }
        Ok(totals)
    }

    async fn upsert_counts(&self, observations: &[CaseObservation]) -> Result<Vec<UpsertOutcome>> {
        let mut regions = self.regions.lock().unwrap();
        let mut outcomes = Vec::with_capacity(observations.len());

        for obs in observations {
            if let Err(reason) = validate_code(&obs.code) {
                outcomes.push(UpsertOutcome {
                    code: obs.code.clone(),
                    result: Err(reason),
                });
                continue;
            }

            let status = match regions.get_mut(&obs.code) {
                Some(record) => {
                    if record.last_updated.map_or(false, |stored| stored > obs.observed_at) {
                        UpsertStatus::Stale
                    } else {
                        record.active_cases = Some(obs.active_cases);
                        record.last_updated = Some(obs.observed_at);
                        UpsertStatus::Updated
                    }
                }
                None => {
                    regions.insert(
                        obs.code.clone(),
                        RegionRecord {
                            code: obs.code.clone(),
                            name: String::new(),
                            active_cases: Some(obs.active_cases),
                            last_updated: Some(obs.observed_at),
                        },
                    );
                    UpsertStatus::Created
                }
            };

            debug!("Upserted counts for region {}: {:?}", obs.code, status);
            outcomes.push(UpsertOutcome {
                code: obs.code.clone(),
                result: Ok(status),
            });
        }

        Ok(outcomes)
    }

    async fn upsert_names(&self, entries: &[RegionEntry]) -> Result<Vec<UpsertOutcome>> {
        let mut regions = self.regions.lock().unwrap();
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            if let Err(reason) = validate_code(&entry.code) {
                outcomes.push(UpsertOutcome {
                    code: entry.code.clone(),
                    result: Err(reason),
                });
                continue;
            }
            if entry.name.trim().is_empty() {
                outcomes.push(UpsertOutcome {
                    code: entry.code.clone(),
                    result: Err(format!("blank name for region {}", entry.code)),
                });
                continue;
            }

            let status = match regions.get_mut(&entry.code) {
                Some(record) => {
                    record.name = entry.name.clone();
                    UpsertStatus::Updated
                }
                None => {
                    regions.insert(
                        entry.code.clone(),
                        RegionRecord {
                            code: entry.code.clone(),
                            name: entry.name.clone(),
                            active_cases: None,
                            last_updated: None,
                        },
                    );
                    UpsertStatus::Created
                }
            };

            outcomes.push(UpsertOutcome {
                code: entry.code.clone(),
                result: Ok(status),
            });
        }

        Ok(outcomes)
    }
}
