//! HTTP client for the remote fraud-review service.
//!
//! Thin reqwest wrapper over the two endpoints the job uses: case
//! submission and case polling. Every request carries a bounded
//! timeout so one slow remote call surfaces as a per-case failure
//! instead of stalling the whole tick.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CasePayload, ReviewUpdate};
use crate::domain::ports::ReviewClient;

#[derive(Debug, Clone)]
pub struct HttpReviewClient {
    http: Client,
    base_url: String,
    api_key: String,
}

/// Body of a successful submission response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "investigationId")]
    investigation_id: Option<String>,
}

impl HttpReviewClient {
    /// Create a client for the given API base URL and key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ReviewClient for HttpReviewClient {
    async fn submit(&self, payload: &CasePayload) -> DomainResult<Option<String>> {
        let url = format!("{}/cases", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.api_key, None::<&str>)
            .json(payload)
            .send()
            .await
            .map_err(|e| DomainError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Submission(format!(
                "submission rejected with {status}: {body}"
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Submission(e.to_string()))?;

        // An empty identifier means "accepted, not assigned yet".
        Ok(body.investigation_id.filter(|id| !id.is_empty()))
    }

    async fn fetch(&self, external_code: &str) -> DomainResult<ReviewUpdate> {
        let url = format!("{}/cases/{external_code}", self.base_url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, None::<&str>)
            .send()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(DomainError::RemoteCaseNotFound(external_code.to_string()))
            }
            status if !status.is_success() => {
                return Err(DomainError::Transport(format!(
                    "fetch failed with {status}"
                )))
            }
            _ => {}
        }

        let fields: BTreeMap<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        Ok(ReviewUpdate::new(fields))
    }
}
