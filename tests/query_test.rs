use anyhow::Result;
use chrono::{TimeZone, Utc};
use covid_tracker::domain::{CaseObservation, RegionEntry, COUNTRY_CODE};
use covid_tracker::error::TrackerError;
use covid_tracker::query::QueryService;
use covid_tracker::reconcile::Reconciler;
use covid_tracker::registry;
use covid_tracker::store::MemoryRegionStore;
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

async fn seeded_service() -> Result<(Arc<MemoryRegionStore>, QueryService)> {
    let store = Arc::new(MemoryRegionStore::new());
    registry::sync_registry(
        store.as_ref(),
        &[
            entry("KL", "Kerala"),
            entry("DL", "Delhi"),
            entry("WB", "West Bengal"),
        ],
    )
    .await?;

    let reconciler = Reconciler::new(store.clone());
    reconciler
        .reconcile(&[observation("KL", 100, 1), observation("DL", 200, 3)])
        .await?;

    Ok((store.clone(), QueryService::new(store)))
}

#[tokio::test]
async fn get_by_codes_omits_unknown_codes() -> Result<()> {
    let (_store, service) = seeded_service().await?;

    let records = service
        .get_by_codes(&["KL".into(), "DL".into(), "ZZ".into()])
        .await?;

    assert_eq!(records.len(), 2);
    let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    assert!(codes.contains(&"KL"));
    assert!(codes.contains(&"DL"));
    Ok(())
}

#[tokio::test]
async fn get_by_name_matches_case_insensitive_substring() -> Result<()> {
    let (_store, service) = seeded_service().await?;

    let record = service.get_by_name("keral").await?;
    assert_eq!(record.code, "KL");
    assert_eq!(record.name, "Kerala");
    Ok(())
}

#[tokio::test]
async fn get_by_name_misses_with_not_found() -> Result<()> {
    let (_store, service) = seeded_service().await?;

    let err = service.get_by_name("atlantis").await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn ambiguous_name_resolves_to_smallest_code() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    // Both names contain "pradesh"; UP sorts after AP.
    registry::sync_registry(
        store.as_ref(),
        &[entry("UP", "Uttar Pradesh"), entry("AP", "Andhra Pradesh")],
    )
    .await?;

    let service = QueryService::new(store);
    let record = service.get_by_name("pradesh").await?;
    assert_eq!(record.code, "AP");
    Ok(())
}

#[tokio::test]
async fn country_total_on_empty_store_is_the_sentinel() -> Result<()> {
    let service = QueryService::new(Arc::new(MemoryRegionStore::new()));

    let aggregate = service.country_total().await?;
    assert_eq!(aggregate.code, COUNTRY_CODE);
    assert_eq!(aggregate.active_cases, -1);
    Ok(())
}

#[tokio::test]
async fn registry_only_records_do_not_count_as_data() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    registry::sync_registry(store.as_ref(), &[entry("KL", "Kerala")]).await?;

    let service = QueryService::new(store);
    let aggregate = service.country_total().await?;
    assert_eq!(aggregate.active_cases, -1);
    Ok(())
}

#[tokio::test]
async fn country_total_sums_counts_and_takes_newest_stamp() -> Result<()> {
    let (_store, service) = seeded_service().await?;

    let aggregate = service.country_total().await?;
    assert_eq!(aggregate.active_cases, 300);
    assert_eq!(
        aggregate.last_updated,
        Utc.with_ymd_and_hms(2021, 10, 3, 12, 0, 0).unwrap()
    );
    Ok(())
}

#[tokio::test]
async fn negative_counts_participate_in_the_total() -> Result<()> {
    let store = Arc::new(MemoryRegionStore::new());
    let reconciler = Reconciler::new(store.clone());
    reconciler
        .reconcile(&[observation("KL", 100, 1), observation("LD", -10, 2)])
        .await?;

    let service = QueryService::new(store);
    let aggregate = service.country_total().await?;
    assert_eq!(aggregate.active_cases, 90);
    Ok(())
}
