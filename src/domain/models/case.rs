//! Fraud-review case domain model.
//!
//! A case is the unit of work for one order under fraud review. Cases
//! move forward through a small status pipeline and are never moved
//! backward by this job.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::order::ReviewUpdate;

/// Status of a case in the review pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Waiting for an asynchronous payment signal before submission
    #[default]
    AsyncWait,
    /// Eligible for submission to the remote review service
    WaitingSubmission,
    /// Submitted, awaiting the remote service's verdict
    InReview,
    /// Closed by an external process; never touched by this job
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AsyncWait => "async_wait",
            Self::WaitingSubmission => "waiting_submission",
            Self::InReview => "in_review",
            Self::Closed => "closed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "async_wait" => Some(Self::AsyncWait),
            "waiting_submission" => Some(Self::WaitingSubmission),
            "in_review" => Some(Self::InReview),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Valid transitions from this status. Strictly forward so no
    /// caller can regress a case.
    pub fn valid_transitions(&self) -> Vec<CaseStatus> {
        match self {
            Self::AsyncWait => vec![Self::WaitingSubmission, Self::Closed],
            Self::WaitingSubmission => vec![Self::InReview, Self::Closed],
            Self::InReview => vec![Self::Closed],
            Self::Closed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fraud-review case tied to one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Unique case identifier, assigned at creation.
    pub id: Uuid,
    /// Identifier of the associated order. Immutable.
    pub order_reference: String,
    /// Current pipeline status.
    pub status: CaseStatus,
    /// Identifier assigned by the remote review service once submitted.
    pub external_code: Option<String>,
    /// How many times the surrounding retry infrastructure has touched
    /// this case. Advisory input to the promotion decision, never
    /// written by this job.
    pub retry_count: u32,
    /// The case's full state as understood by the remote service,
    /// keyed by attribute name. BTreeMap keeps a stable field order
    /// for fingerprinting.
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Claim token proving lock ownership. Present only on records
    /// obtained from `CaseStore::load_for_update`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_token: Option<Uuid>,
    /// When the case was created.
    pub created_at: DateTime<Utc>,
    /// Stamped on every transition this job performs.
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Create a new case in `AsyncWait` for the given order.
    pub fn new(order_reference: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_reference: order_reference.into(),
            status: CaseStatus::AsyncWait,
            external_code: None,
            retry_count: 0,
            fields: BTreeMap::new(),
            lock_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style retry count, mostly for tests and seeding.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Move the case forward, stamping `updated_at`.
    ///
    /// Rejects anything that is not a valid forward transition.
    pub fn set_status(&mut self, new_status: CaseStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }
        self.status = new_status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the identifier handed back by the remote service.
    ///
    /// Set exactly once, at submission; a second assignment is a bug
    /// in the caller.
    pub fn assign_external_code(&mut self, code: impl Into<String>) -> DomainResult<()> {
        if self.external_code.is_some() {
            return Err(DomainError::ExternalCodeAlreadySet(self.id));
        }
        self.external_code = Some(code.into());
        Ok(())
    }

    /// Merge a fetched remote update into the local field map.
    ///
    /// Existing keys are overwritten, new keys inserted. Whether the
    /// merge changed anything is decided by fingerprint comparison,
    /// not here.
    pub fn apply_update(&mut self, update: &ReviewUpdate) {
        for (key, value) in &update.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}
