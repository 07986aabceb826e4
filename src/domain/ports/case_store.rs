//! Persistence port for case records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CaseRecord, CaseStatus};

/// Repository port for case persistence with pessimistic locking.
///
/// The three operations form the whole locking contract the scheduler
/// needs: `find_by_status` never locks, `load_for_update` acquires an
/// exclusive claim and re-reads current persisted state, and `save` is
/// the single release path — it persists mutated fields and drops the
/// claim taken by the matching `load_for_update`. Calling `save` on a
/// record that does not carry a current claim fails with
/// `LockConflict`.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Snapshot of all cases currently in `status`. Takes no locks.
    async fn find_by_status(&self, status: CaseStatus) -> DomainResult<Vec<CaseRecord>>;

    /// Acquire an exclusive claim on a case and return its latest
    /// persisted state. Waits a bounded time under contention and
    /// fails with `LockTimeout` after that.
    async fn load_for_update(&self, id: Uuid) -> DomainResult<CaseRecord>;

    /// Persist the record and release the claim acquired by the
    /// matching `load_for_update`.
    async fn save(&self, record: &CaseRecord) -> DomainResult<()>;
}
