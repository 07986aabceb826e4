//! Domain errors for the casewatch reconciliation job.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while reconciling cases.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Case not found: {0}")]
    CaseNotFound(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Remote case not found: {0}")]
    RemoteCaseNotFound(String),

    #[error("Timed out acquiring lock on case {case_id} after {waited_ms}ms")]
    LockTimeout { case_id: Uuid, waited_ms: u64 },

    #[error("Lock on case {0} is no longer held by this caller")]
    LockConflict(Uuid),

    #[error("Case submission failed: {0}")]
    Submission(String),

    #[error("Remote service transport error: {0}")]
    Transport(String),

    #[error("Persistence failure: {0}")]
    Write(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("External code already assigned to case {0}")]
    ExternalCodeAlreadySet(Uuid),

    #[error("Case {0} is in review but has no external code")]
    MissingExternalCode(Uuid),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convenience alias used throughout the crate.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Write(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
