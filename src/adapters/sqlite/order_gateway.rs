//! SQLite-backed order gateway.
//!
//! Reads the order projections the scheduler needs from an `orders`
//! table maintained by the surrounding platform, and writes review
//! verdicts back onto it. The order domain model proper lives outside
//! this crate; this adapter only touches the handful of columns the
//! reconciliation job cares about.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CasePayload, CaseRecord, OrderContext, VerificationSignals};
use crate::domain::ports::OrderGateway;

#[derive(Clone)]
pub struct SqliteOrderGateway {
    pool: SqlitePool,
}

impl SqliteOrderGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Seed an order row, for tests and demo data.
    pub async fn insert_order(
        &self,
        reference: &str,
        store_id: &str,
        currency: &str,
        avs_code: Option<&str>,
        cvv_code: Option<&str>,
        payload: &serde_json::Value,
    ) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO orders (reference, store_id, currency, avs_code, cvv_code, payload, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reference)
        .bind(store_id)
        .bind(currency)
        .bind(avs_code)
        .bind(cvv_code)
        .bind(payload.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_order(&self, reference: &str) -> DomainResult<OrderRow> {
        sqlx::query_as("SELECT * FROM orders WHERE reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(reference.to_string()))
    }
}

#[async_trait]
impl OrderGateway for SqliteOrderGateway {
    async fn verification_signals(
        &self,
        order_reference: &str,
    ) -> DomainResult<VerificationSignals> {
        let row = self.fetch_order(order_reference).await?;
        Ok(VerificationSignals::new(row.avs_code, row.cvv_code))
    }

    async fn order_context(&self, order_reference: &str) -> DomainResult<OrderContext> {
        let row = self.fetch_order(order_reference).await?;
        Ok(OrderContext {
            store_id: row.store_id,
            currency: row.currency,
        })
    }

    async fn build_payload(&self, order_reference: &str) -> DomainResult<CasePayload> {
        let row = self.fetch_order(order_reference).await?;
        let fields: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.payload)?;
        Ok(CasePayload {
            order_reference: order_reference.to_string(),
            fields,
        })
    }

    async fn apply_case_update(
        &self,
        order_reference: &str,
        case: &CaseRecord,
    ) -> DomainResult<()> {
        let disposition = case
            .fields
            .get("guaranteeDisposition")
            .or_else(|| case.fields.get("disposition"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string);
        let score = case.fields.get("score").and_then(serde_json::Value::as_f64);

        let result = sqlx::query(
            r"UPDATE orders SET review_disposition = ?, review_score = ?, updated_at = ?
               WHERE reference = ?",
        )
        .bind(&disposition)
        .bind(score)
        .bind(Utc::now().to_rfc3339())
        .bind(order_reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::OrderNotFound(order_reference.to_string()));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    #[allow(dead_code)]
    reference: String,
    store_id: String,
    currency: String,
    avs_code: Option<String>,
    cvv_code: Option<String>,
    payload: String,
    #[allow(dead_code)]
    review_disposition: Option<String>,
    #[allow(dead_code)]
    review_score: Option<f64>,
    #[allow(dead_code)]
    updated_at: String,
}
