use crate::domain::{validate_code, RegionEntry};
use crate::error::{Result, TrackerError};
use crate::store::RegionStore;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Loads the canonical region reference data bundled with the deployment.
///
/// The reference file is authoritative ground truth for region naming, so
/// anything wrong with it (missing file, bad JSON, blank or duplicate codes)
/// is a fatal configuration error, not something to paper over at runtime.
pub fn load_regions(path: &Path) -> Result<Vec<RegionEntry>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        TrackerError::RegistryLoad(format!("failed to read {}: {e}", path.display()))
    })?;
    let entries: Vec<RegionEntry> = serde_json::from_str(&raw).map_err(|e| {
        TrackerError::RegistryLoad(format!("failed to parse {}: {e}", path.display()))
    })?;

    if entries.is_empty() {
        return Err(TrackerError::RegistryLoad(format!(
            "{} contains no regions",
            path.display()
        )));
    }

    let mut seen = HashSet::new();
    for entry in &entries {
        if let Err(reason) = validate_code(&entry.code) {
            return Err(TrackerError::RegistryLoad(reason));
        }
        if entry.name.trim().is_empty() {
            return Err(TrackerError::RegistryLoad(format!(
                "blank name for region code {}",
                entry.code
            )));
        }
        if !seen.insert(entry.code.clone()) {
            return Err(TrackerError::RegistryLoad(format!(
                "duplicate region code {}",
                entry.code
            )));
        }
    }

    info!("Loaded {} regions from {}", entries.len(), path.display());
    Ok(entries)
}

#[derive(Debug, Default)]
pub struct RegistrySyncReport {
    pub updated: usize,
    pub failed: Vec<(String, String)>,
}

/// Upserts canonical names into the store, touching nothing else. Counts and
/// observation stamps on existing records survive the pass untouched.
pub async fn sync_registry(
    store: &dyn RegionStore,
    entries: &[RegionEntry],
) -> Result<RegistrySyncReport> {
    let outcomes = store.upsert_names(entries).await?;

    let mut report = RegistrySyncReport::default();
    for outcome in outcomes {
        match outcome.result {
            Ok(_) => report.updated += 1,
            Err(reason) => report.failed.push((outcome.code, reason)),
        }
    }

    info!(
        updated = report.updated,
        failed = report.failed.len(),
        "Registry sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_registry(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_reference_data() {
        let file = write_registry(
            r#"[
                {"name": "Kerala", "state_code": "KL"},
                {"name": "Delhi", "state_code": "DL"}
            ]"#,
        );
        let entries = load_regions(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "KL");
        assert_eq!(entries[0].name, "Kerala");
    }

    #[test]
    fn missing_file_is_a_registry_error() {
        let err = load_regions(Path::new("no-such-states.json")).unwrap_err();
        assert!(matches!(err, TrackerError::RegistryLoad(_)));
    }

    #[test]
    fn duplicate_codes_are_fatal() {
        let file = write_registry(
            r#"[
                {"name": "Kerala", "state_code": "KL"},
                {"name": "Kerala Again", "state_code": "KL"}
            ]"#,
        );
        let err = load_regions(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate region code KL"));
    }

    #[test]
    fn blank_code_is_fatal() {
        let file = write_registry(r#"[{"name": "Kerala", "state_code": ""}]"#);
        assert!(load_regions(file.path()).is_err());
    }

    #[test]
    fn malformed_json_is_a_registry_error() {
        let file = write_registry("not json at all");
        let err = load_regions(file.path()).unwrap_err();
        assert!(matches!(err, TrackerError::RegistryLoad(_)));
    }
}
