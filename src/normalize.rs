use crate::domain::CaseObservation;
use crate::upstream::RawSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Shape one snapshot entry must have. All fields are required: the feed is
/// untrusted input and a partial entry is skipped rather than defaulted.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    meta: EntryMeta,
    total: EntryTotals,
}

#[derive(Debug, Deserialize)]
struct EntryMeta {
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct EntryTotals {
    confirmed: i64,
    deceased: i64,
    recovered: i64,
}

/// Entry that failed to parse. Reported alongside the usable observations;
/// never aborts the rest of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NormalizedSnapshot {
    pub observations: Vec<CaseObservation>,
    pub skipped: Vec<SkippedEntry>,
}

/// Converts a raw provider snapshot into canonical observations.
///
/// One entry in, one observation out, keyed exactly as the provider keyed it.
/// The active count is confirmed - recovered - deceased and may come out
/// negative when the upstream totals are inconsistent; it is passed through
/// unclamped so downstream consumers can detect the condition.
pub fn normalize(snapshot: &RawSnapshot) -> NormalizedSnapshot {
    let mut result = NormalizedSnapshot::default();

    for (key, value) in snapshot {
        match serde_json::from_value::<SnapshotEntry>(value.clone()) {
            Ok(entry) => result.observations.push(CaseObservation {
                code: key.clone(),
                active_cases: entry.total.confirmed - entry.total.recovered - entry.total.deceased,
                observed_at: entry.meta.last_updated,
            }),
            Err(e) => {
                warn!("Skipping malformed snapshot entry {}: {}", key, e);
                result.skipped.push(SkippedEntry {
                    key: key.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> RawSnapshot {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test snapshot must be an object"),
        }
    }

    fn entry(confirmed: i64, recovered: i64, deceased: i64) -> serde_json::Value {
        json!({
            "meta": { "last_updated": "2021-10-31T09:32:13+05:30" },
            "total": { "confirmed": confirmed, "recovered": recovered, "deceased": deceased }
        })
    }

    #[test]
    fn emits_one_observation_per_entry() {
        let raw = snapshot(json!({
            "KL": entry(100, 40, 10),
            "DL": entry(200, 50, 25),
        }));

        let result = normalize(&raw);
        assert_eq!(result.observations.len(), 2);
        assert!(result.skipped.is_empty());

        let kl = result.observations.iter().find(|o| o.code == "KL").unwrap();
        assert_eq!(kl.active_cases, 50);
    }

    #[test]
    fn negative_active_counts_pass_through_unclamped() {
        let raw = snapshot(json!({ "LD": entry(10, 15, 5) }));
        let result = normalize(&raw);
        assert_eq!(result.observations[0].active_cases, -10);
    }

    #[test]
    fn malformed_entry_is_skipped_and_reported() {
        let raw = snapshot(json!({
            "KL": entry(100, 40, 10),
            "XX": { "total": { "confirmed": 1 } },
            "DL": entry(200, 50, 25),
        }));

        let result = normalize(&raw);
        assert_eq!(result.observations.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].key, "XX");
    }

    #[test]
    fn missing_count_field_is_skipped_not_defaulted() {
        let raw = snapshot(json!({
            "KL": {
                "meta": { "last_updated": "2021-10-31T09:32:13+05:30" },
                "total": { "confirmed": 100, "deceased": 10 }
            }
        }));

        let result = normalize(&raw);
        assert!(result.observations.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert!(result.skipped[0].reason.contains("recovered"));
    }

    #[test]
    fn unknown_provider_keys_are_still_emitted() {
        // Codes the registry has never heard of flow through; reconciliation
        // decides what happens to them.
        let raw = snapshot(json!({ "TT": entry(1000, 400, 100) }));
        let result = normalize(&raw);
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].code, "TT");
    }
}
