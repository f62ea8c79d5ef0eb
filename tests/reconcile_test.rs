use anyhow::Result;
use chrono::{TimeZone, Utc};
use covid_tracker::domain::{CaseObservation, RegionEntry};
use covid_tracker::reconcile::Reconciler;
use covid_tracker::registry;
use covid_tracker::store::{MemoryRegionStore, RegionStore};
use std::sync::Arc;

fn observation(code: &str, active: i64, day: u32) -> CaseObservation {
    CaseObservation {
        code: code.to_string(),
        active_cases: active,
        observed_at: Utc.with_ymd_and_hms(2021, 10, day, 12, 0, 0).unwrap(),
    }
}

fn entry(code: &str, name: &str) -> RegionEntry {
    RegionEntry {
        name: name.to_string(),
        code: code.to_string(),
    }
}

#[tokio::test]
async fn reconcile_is_idempotent() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());
    let batch = vec![observation("KL", 100, 1), observation("DL", 200, 1)];

    let first = reconciler.reconcile(&batch).await?;
    assert_eq!(first.updated, 2);
    assert!(first.failed.is_empty());
    let after_first = store.get_by_codes(&["KL".into(), "DL".into()]).await?;

    let second = reconciler.reconcile(&batch).await?;
    assert_eq!(second.updated, 2);
    let after_second = store.get_by_codes(&["KL".into(), "DL".into()]).await?;

    assert_eq!(after_first, after_second);
    Ok(())
}

#[tokio::test]
async fn unknown_code_becomes_a_record_with_empty_name() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());

    reconciler.reconcile(&[observation("ZZ", 5, 1)]).await?;

    let records = store.get_by_codes(&["ZZ".into()]).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "");
    assert_eq!(records[0].active_cases, Some(5));
    Ok(())
}

#[tokio::test]
async fn one_bad_record_does_not_block_the_rest() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());

    let batch = vec![
        observation("KL", 100, 1),
        observation("", 7, 1),
        observation("DL", 200, 1),
    ];
    let result = reconciler.reconcile(&batch).await?;

    assert_eq!(result.updated, 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].code, "");

    let records = store.get_by_codes(&["KL".into(), "DL".into()]).await?;
    assert_eq!(records.len(), 2);
    Ok(())
}

#[tokio::test]
async fn ingestion_pass_leaves_registry_names_alone() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    registry::sync_registry(store.as_ref(), &[entry("KL", "Kerala")]).await?;

    let reconciler = Reconciler::new(store.clone());
    reconciler.reconcile(&[observation("KL", 100, 1)]).await?;

    let records = store.get_by_codes(&["KL".into()]).await?;
    assert_eq!(records[0].name, "Kerala");
    assert_eq!(records[0].active_cases, Some(100));
    Ok(())
}

#[tokio::test]
async fn registry_pass_backfills_names_without_touching_counts() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());

    // Ingestion first: record exists with an empty name.
    reconciler.reconcile(&[observation("KL", 100, 1)]).await?;

    let report = registry::sync_registry(store.as_ref(), &[entry("KL", "Kerala")]).await?;
    assert_eq!(report.updated, 1);

    let records = store.get_by_codes(&["KL".into()]).await?;
    assert_eq!(records[0].name, "Kerala");
    assert_eq!(records[0].active_cases, Some(100));
    Ok(())
}

#[tokio::test]
async fn stale_cycle_does_not_regress_timestamps() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());

    reconciler.reconcile(&[observation("KL", 100, 5)]).await?;
    let result = reconciler.reconcile(&[observation("KL", 40, 2)]).await?;

    assert_eq!(result.updated, 0);
    assert_eq!(result.stale, 1);

    let records = store.get_by_codes(&["KL".into()]).await?;
    assert_eq!(records[0].active_cases, Some(100));
    assert_eq!(
        records[0].last_updated,
        Some(Utc.with_ymd_and_hms(2021, 10, 5, 12, 0, 0).unwrap())
    );
    Ok(())
}

#[tokio::test]
async fn newer_cycle_replaces_counts_wholesale() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());

    reconciler.reconcile(&[observation("KL", 100, 1)]).await?;
    reconciler.reconcile(&[observation("KL", 60, 2)]).await?;

    let records = store.get_by_codes(&["KL".into()]).await?;
    assert_eq!(records[0].active_cases, Some(60));
    Ok(())
}

#[tokio::test]
async fn empty_batch_is_a_no_op() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store);

    let result = reconciler.reconcile(&[]).await?;
    assert_eq!(result.updated, 0);
    assert!(result.failed.is_empty());
    Ok(())
}
