use super::RegionStore;
use crate::domain::{
    validate_code, CaseObservation, CaseTotals, RegionEntry, RegionRecord, UpsertOutcome,
    UpsertStatus,
};
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database};
use std::env;
use tracing::{info, warn};

/// Durable region store on Turso/libSQL: one row per region keyed by code.
pub struct TursoRegionStore {
    db: Database,
}

impl TursoRegionStore {
    /// Connects using `LIBSQL_URL` / `LIBSQL_AUTH_TOKEN` and applies the
    /// schema migration.
    pub async fn connect() -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| {
            TrackerError::Persistence("LIBSQL_URL environment variable not set".to_string())
        })?;
        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| {
            TrackerError::Persistence("LIBSQL_AUTH_TOKEN environment variable not set".to_string())
        })?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| {
                TrackerError::Persistence(format!("failed to connect to database: {e}"))
            })?;

        let store = Self { db };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| {
            TrackerError::Persistence(format!("failed to get database connection: {e}"))
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let conn = self.connection().await?;
        let migration = include_str!("../../migrations/001_create_regions.sql");
        conn.execute_batch(migration).await.map_err(|e| {
            TrackerError::Persistence(format!("failed to run schema migration: {e}"))
        })?;
        Ok(())
    }
}

/// Stamps are stored as fixed-width RFC 3339 text so SQL `MAX` and the
/// `<=` staleness guard order them chronologically.
fn stamp_to_sql(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn stamp_from_sql(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TrackerError::Persistence(format!("unreadable stored timestamp {raw:?}: {e}")))
}

fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn row_to_record(row: &libsql::Row) -> Result<RegionRecord> {
    let code: String = row
        .get(0)
        .map_err(|e| TrackerError::Persistence(format!("failed to get code: {e}")))?;
    let name: String = row
        .get(1)
        .map_err(|e| TrackerError::Persistence(format!("failed to get name: {e}")))?;

    let active_cases = match row
        .get_value(2)
        .map_err(|e| TrackerError::Persistence(format!("failed to get active_cases: {e}")))?
    {
        libsql::Value::Null => None,
        libsql::Value::Integer(n) => Some(n),
        other => {
            return Err(TrackerError::Persistence(format!(
                "unexpected active_cases value: {other:?}"
            )))
        }
    };

    let last_updated = match row
        .get_value(3)
        .map_err(|e| TrackerError::Persistence(format!("failed to get last_updated: {e}")))?
    {
        libsql::Value::Null => None,
        libsql::Value::Text(raw) => Some(stamp_from_sql(&raw)?),
        other => {
            return Err(TrackerError::Persistence(format!(
                "unexpected last_updated value: {other:?}"
            )))
        }
    };

    Ok(RegionRecord {
        code,
        name,
        active_cases,
        last_updated,
    })
}

#[async_trait]
impl RegionStore for TursoRegionStore {
    async fn get_by_codes(&self, codes: &[String]) -> Result<Vec<RegionRecord>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connection().await?;

        let placeholders = (1..=codes.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT code, name, active_cases, last_updated FROM regions \
             WHERE code IN ({placeholders}) ORDER BY code ASC"
        );

        let mut rows = conn
            .query(&sql, libsql::params_from_iter(codes.iter().cloned()))
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to query regions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to read row: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn find_by_name(&self, fragment: &str) -> Result<Vec<RegionRecord>> {
        let conn = self.connection().await?;

        let mut rows = conn
            .query(
                "SELECT code, name, active_cases, last_updated FROM regions \
                 WHERE name <> '' AND name LIKE '%' || ?1 || '%' ESCAPE '\\' \
                 ORDER BY code ASC",
                libsql::params![escape_like(fragment)],
            )
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to query regions by name: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to read row: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn aggregate_totals(&self) -> Result<Option<CaseTotals>> {
        let conn = self.connection().await?;

        let mut rows = conn
            .query(
                "SELECT SUM(active_cases), MAX(last_updated) FROM regions \
                 WHERE active_cases IS NOT NULL AND last_updated IS NOT NULL",
                (),
            )
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to aggregate regions: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| TrackerError::Persistence(format!("failed to read row: {e}")))?
        else {
            return Ok(None);
        };

        let total = match row
            .get_value(0)
            .map_err(|e| TrackerError::Persistence(format!("failed to get total: {e}")))?
        {
            libsql::Value::Null => return Ok(None),
            libsql::Value::Integer(n) => n,
            other => {
                return Err(TrackerError::Persistence(format!(
                    "unexpected aggregate value: {other:?}"
                )))
            }
        };

        let last_updated = match row
            .get_value(1)
            .map_err(|e| TrackerError::Persistence(format!("failed to get max stamp: {e}")))?
        {
            libsql::Value::Text(raw) => stamp_from_sql(&raw)?,
            other => {
                return Err(TrackerError::Persistence(format!(
                    "unexpected max stamp value: {other:?}"
                )))
            }
        };

        Ok(Some(CaseTotals {
            active_cases: total,
            last_updated,
        }))
    }

    async fn upsert_counts(&self, observations: &[CaseObservation]) -> Result<Vec<UpsertOutcome>> {
        let conn = self.connection().await?;
        let mut outcomes = Vec::with_capacity(observations.len());

        for obs in observations {
            if let Err(reason) = validate_code(&obs.code) {
                outcomes.push(UpsertOutcome {
                    code: obs.code.clone(),
                    result: Err(reason),
                });
                continue;
            }

            // The timestamp guard lives in the statement itself so racing
            // cycles cannot interleave between a read and a write.
            let upsert = conn
                .execute(
                    "INSERT INTO regions (code, name, active_cases, last_updated) \
                     VALUES (?1, '', ?2, ?3) \
                     ON CONFLICT(code) DO UPDATE SET \
                       active_cases = excluded.active_cases, \
                       last_updated = excluded.last_updated \
                     WHERE regions.last_updated IS NULL \
                        OR regions.last_updated <= excluded.last_updated",
                    libsql::params![
                        obs.code.as_str(),
                        obs.active_cases,
                        stamp_to_sql(obs.observed_at)
                    ],
                )
                .await;

            let result = match upsert {
                Ok(0) => Ok(UpsertStatus::Stale),
                Ok(_) => Ok(UpsertStatus::Updated),
                Err(e) => {
                    warn!("Count upsert failed for region {}: {}", obs.code, e);
                    Err(e.to_string())
                }
            };
            outcomes.push(UpsertOutcome {
                code: obs.code.clone(),
                result,
            });
        }

        Ok(outcomes)
    }

    async fn upsert_names(&self, entries: &[RegionEntry]) -> Result<Vec<UpsertOutcome>> {
        let conn = self.connection().await?;
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

            let upsert = conn
                .execute(
                    "INSERT INTO regions (code, name) VALUES (?1, ?2) \
                     ON CONFLICT(code) DO UPDATE SET name = excluded.name",
                    libsql::params![entry.code.as_str(), entry.name.as_str()],
                )
                .await;

            let result = match upsert {
                Ok(_) => Ok(UpsertStatus::Updated),
                Err(e) => {
                    warn!("Name upsert failed for region {}: {}", entry.code, e);
                    Err(e.to_string())
                }
            };
            outcomes.push(UpsertOutcome {
                code: entry.code.clone(),
                result,
            });
        }

        Ok(outcomes)
    }
}
