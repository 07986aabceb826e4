//! SQLite implementation of the `CaseStore` port.
//!
//! The exclusive lock is a claim token on the case row with a lease
//! timestamp. `load_for_update` atomically claims the row (retrying up
//! to a bounded wait), `save` persists and clears the claim in one
//! statement. A holder that dies without saving leaves a lease that
//! expires after the TTL, so no case stays locked forever.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CaseRecord, CaseStatus};
use crate::domain::ports::CaseStore;

/// Delay between claim attempts while waiting for a contended lock.
const CLAIM_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct SqliteCaseStore {
    pool: SqlitePool,
    lock_timeout: Duration,
    lock_ttl: Duration,
}

impl SqliteCaseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(3),
            lock_ttl: Duration::from_secs(300),
        }
    }

    /// Override the bounded lock wait and the lease TTL.
    pub fn with_lock_settings(mut self, lock_timeout: Duration, lock_ttl: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self.lock_ttl = lock_ttl;
        self
    }

    /// Insert a new case row. Case creation itself belongs to the
    /// surrounding infrastructure; this exists for seeding and tests.
    pub async fn insert(&self, case: &CaseRecord) -> DomainResult<()> {
        let fields_json = serde_json::to_string(&case.fields)?;

        sqlx::query(
            r"INSERT INTO cases (id, order_reference, status, external_code, retry_count,
               fields, lock_token, locked_at, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)",
        )
        .bind(case.id.to_string())
        .bind(&case.order_reference)
        .bind(case.status.as_str())
        .bind(&case.external_code)
        .bind(i64::from(case.retry_count))
        .bind(&fields_json)
        .bind(case.created_at.to_rfc3339())
        .bind(case.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM cases WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn fetch_claimed(&self, id: Uuid, token: Uuid) -> DomainResult<CaseRecord> {
        let row: CaseRow = sqlx::query_as("SELECT * FROM cases WHERE id = ? AND lock_token = ?")
            .bind(id.to_string())
            .bind(token.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::LockConflict(id))?;
        row.try_into()
    }
}

#[async_trait]
impl CaseStore for SqliteCaseStore {
    async fn find_by_status(&self, status: CaseStatus) -> DomainResult<Vec<CaseRecord>> {
        let rows: Vec<CaseRow> =
            sqlx::query_as("SELECT * FROM cases WHERE status = ? ORDER BY updated_at, id")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn load_for_update(&self, id: Uuid) -> DomainResult<CaseRecord> {
        let started = Instant::now();

        loop {
            let token = Uuid::new_v4();
            let now = Utc::now();
            let stale_cutoff = now - chrono::Duration::from_std(self.lock_ttl).unwrap_or_default();

            let result = sqlx::query(
                r"UPDATE cases SET lock_token = ?, locked_at = ?
                   WHERE id = ? AND (lock_token IS NULL OR locked_at < ?)",
            )
            .bind(token.to_string())
            .bind(now.to_rfc3339())
            .bind(id.to_string())
            .bind(stale_cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return self.fetch_claimed(id, token).await;
            }

            if !self.exists(id).await? {
                return Err(DomainError::CaseNotFound(id));
            }

            let waited = started.elapsed();
            if waited >= self.lock_timeout {
                return Err(DomainError::LockTimeout {
                    case_id: id,
                    waited_ms: waited.as_millis() as u64,
                });
            }

            tokio::time::sleep(CLAIM_RETRY_DELAY).await;
        }
    }

    async fn save(&self, record: &CaseRecord) -> DomainResult<()> {
        let token = record.lock_token.ok_or(DomainError::LockConflict(record.id))?;
        let fields_json = serde_json::to_string(&record.fields)?;

        let result = sqlx::query(
            r"UPDATE cases SET status = ?, external_code = ?, retry_count = ?,
               fields = ?, updated_at = ?, lock_token = NULL, locked_at = NULL
               WHERE id = ? AND lock_token = ?",
        )
        .bind(record.status.as_str())
        .bind(&record.external_code)
        .bind(i64::from(record.retry_count))
        .bind(&fields_json)
        .bind(record.updated_at.to_rfc3339())
        .bind(record.id.to_string())
        .bind(token.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.exists(record.id).await? {
                return Err(DomainError::LockConflict(record.id));
            }
            return Err(DomainError::CaseNotFound(record.id));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    order_reference: String,
    status: String,
    external_code: Option<String>,
    retry_count: i64,
    fields: String,
    lock_token: Option<String>,
    #[allow(dead_code)]
    locked_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CaseRow> for CaseRecord {
    type Error = DomainError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let status = CaseStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid status: {}", row.status))
        })?;

        let fields: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.fields)?;

        let lock_token = row
            .lock_token
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let created_at = parse_timestamp(&row.created_at)?;
        let updated_at = parse_timestamp(&row.updated_at)?;

        Ok(CaseRecord {
            id,
            order_reference: row.order_reference,
            status,
            external_code: row.external_code,
            retry_count: u32::try_from(row.retry_count).unwrap_or(0),
            fields,
            lock_token,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::connection::create_test_pool;
    use crate::adapters::sqlite::migrations::{all_embedded_migrations, Migrator};
    use serde_json::json;

    async fn setup_store() -> SqliteCaseStore {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        SqliteCaseStore::new(pool)
            .with_lock_settings(Duration::from_millis(150), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_insert_and_find_by_status() {
        let store = setup_store().await;
        let case = CaseRecord::new("100000001").with_field("score", json!(42));
        store.insert(&case).await.unwrap();

        let found = store.find_by_status(CaseStatus::AsyncWait).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, case.id);
        assert_eq!(found[0].fields["score"], json!(42));
        assert!(found[0].lock_token.is_none());

        let empty = store
            .find_by_status(CaseStatus::WaitingSubmission)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_load_save_roundtrip() {
        let store = setup_store().await;
        let case = CaseRecord::new("100000002");
        store.insert(&case).await.unwrap();

        let mut locked = store.load_for_update(case.id).await.unwrap();
        assert!(locked.lock_token.is_some());

        locked.set_status(CaseStatus::WaitingSubmission).unwrap();
        store.save(&locked).await.unwrap();

        let reloaded = store.load_for_update(case.id).await.unwrap();
        assert_eq!(reloaded.status, CaseStatus::WaitingSubmission);
        store.save(&reloaded).await.unwrap();
    }

    #[tokio::test]
    async fn test_contention_times_out() {
        let store = setup_store().await;
        let case = CaseRecord::new("100000003");
        store.insert(&case).await.unwrap();

        let held = store.load_for_update(case.id).await.unwrap();

        let err = store.load_for_update(case.id).await.unwrap_err();
        assert!(matches!(err, DomainError::LockTimeout { .. }));

        // Release, then the lock is available again.
        store.save(&held).await.unwrap();
        let reacquired = store.load_for_update(case.id).await.unwrap();
        store.save(&reacquired).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_without_claim_is_conflict() {
        let store = setup_store().await;
        let case = CaseRecord::new("100000004");
        store.insert(&case).await.unwrap();

        // Never passed through load_for_update.
        let err = store.save(&case).await.unwrap_err();
        assert!(matches!(err, DomainError::LockConflict(_)));
    }

    #[tokio::test]
    async fn test_save_with_stale_token_is_conflict() {
        let store = setup_store().await;
        let case = CaseRecord::new("100000005");
        store.insert(&case).await.unwrap();

        let first = store.load_for_update(case.id).await.unwrap();
        store.save(&first).await.unwrap();

        // The claim was already released; saving again must fail.
        let err = store.save(&first).await.unwrap_err();
        assert!(matches!(err, DomainError::LockConflict(_)));
    }

    #[tokio::test]
    async fn test_stale_lease_is_reclaimed() {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        let store = SqliteCaseStore::new(pool.clone())
            .with_lock_settings(Duration::from_millis(150), Duration::from_millis(10));

        let case = CaseRecord::new("100000006");
        store.insert(&case).await.unwrap();

        // Simulate a holder that died without saving.
        let _abandoned = store.load_for_update(case.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let reclaimed = store.load_for_update(case.id).await.unwrap();
        store.save(&reclaimed).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_case() {
        let store = setup_store().await;
        let err = store.load_for_update(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::CaseNotFound(_)));
    }
}
