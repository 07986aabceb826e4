//! Port for the remote fraud-review service.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CasePayload, ReviewUpdate};

/// Client port for submitting cases and polling their remote state.
#[async_trait]
pub trait ReviewClient: Send + Sync {
    /// Submit a case for review.
    ///
    /// `Ok(None)` means the service accepted the request but has not
    /// assigned an identifier yet; the case stays eligible for
    /// resubmission on the next tick. Transport or protocol failures
    /// surface as `Submission`.
    async fn submit(&self, payload: &CasePayload) -> DomainResult<Option<String>>;

    /// Fetch the current remote state of a submitted case.
    ///
    /// Fails with `RemoteCaseNotFound` if the service no longer knows
    /// the code, `Transport` on everything else.
    async fn fetch(&self, external_code: &str) -> DomainResult<ReviewUpdate>;
}
