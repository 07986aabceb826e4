//! The three-phase case reconciliation core.
//!
//! One `run()` per schedule tick:
//!
//! 1. promote stalled `AsyncWait` cases that are eligible for
//!    submission,
//! 2. submit `WaitingSubmission` cases to the remote review service,
//! 3. poll `InReview` cases and propagate materially new remote state
//!    onto the order.
//!
//! Every case is processed under an exclusive store claim, and every
//! per-case failure is caught at the loop boundary so one bad case
//! never blocks the rest of the batch.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CaseRecord, CaseStatus};
use crate::domain::ports::{CaseStore, OrderGateway, PaymentEnvironment, ReviewClient};
use crate::services::change_detector::ChangeDetector;

/// Orchestrates the three reconciliation phases over injected
/// collaborator ports.
pub struct RetryScheduler {
    store: Arc<dyn CaseStore>,
    review: Arc<dyn ReviewClient>,
    orders: Arc<dyn OrderGateway>,
    environment: Arc<dyn PaymentEnvironment>,
    promotion_threshold: u32,
}

impl RetryScheduler {
    pub fn new(
        store: Arc<dyn CaseStore>,
        review: Arc<dyn ReviewClient>,
        orders: Arc<dyn OrderGateway>,
        environment: Arc<dyn PaymentEnvironment>,
        promotion_threshold: u32,
    ) -> Self {
        Self {
            store,
            review,
            orders,
            environment,
            promotion_threshold,
        }
    }

    /// Run one full reconciliation tick.
    ///
    /// Never fails: every case is handled independently, with errors
    /// logged at the loop boundary. All three status snapshots are
    /// taken up front so a case promoted by phase 1 is only picked up
    /// by phase 2 on the next tick, never mid-run.
    pub async fn run(&self) {
        debug!("retry tick started");
        let async_wait = self.snapshot(CaseStatus::AsyncWait, "promote").await;
        let waiting = self.snapshot(CaseStatus::WaitingSubmission, "submit").await;
        let in_review = self.snapshot(CaseStatus::InReview, "reconcile").await;

        self.promote_async_wait(async_wait).await;
        self.submit_waiting(waiting).await;
        self.reconcile_in_review(in_review).await;
        debug!("retry tick ended");
    }

    /// Fetch a status bucket, degrading to an empty batch on error.
    async fn snapshot(&self, status: CaseStatus, phase: &'static str) -> Vec<CaseRecord> {
        match self.store.find_by_status(status).await {
            Ok(cases) => cases,
            Err(e) => {
                error!(phase, %status, error = %e, "failed to query cases");
                Vec::new()
            }
        }
    }

    /// Phase 1: promote stalled async-wait cases.
    async fn promote_async_wait(&self, cases: Vec<CaseRecord>) {
        for case in cases {
            debug!(case_id = %case.id, order = %case.order_reference, "checking case for promotion");
            if let Err(e) = self.promote_case(&case).await {
                error!(case_id = %case.id, phase = "promote", error = %e, "case processing failed");
            }
        }
    }

    async fn promote_case(&self, case: &CaseRecord) -> DomainResult<()> {
        let signals = self
            .orders
            .verification_signals(&case.order_reference)
            .await?;

        // Submit once the payment gateway has answered on both fronts,
        // or once we have waited long enough that it never will.
        let eligible = case.retry_count >= self.promotion_threshold || signals.both_present();
        if !eligible {
            return Ok(());
        }

        let mut locked = self.store.load_for_update(case.id).await?;
        if locked.status != CaseStatus::AsyncWait {
            // Someone else moved the case between snapshot and lock.
            return self.store.save(&locked).await;
        }

        match locked.set_status(CaseStatus::WaitingSubmission) {
            Ok(()) => self.store.save(&locked).await,
            Err(e) => {
                self.release(&locked).await;
                Err(e)
            }
        }
    }

    /// Phase 2: submit waiting cases to the remote service.
    async fn submit_waiting(&self, cases: Vec<CaseRecord>) {
        for case in cases {
            debug!(case_id = %case.id, order = %case.order_reference, "preparing case for submission");
            if let Err(e) = self.submit_case(&case).await {
                error!(case_id = %case.id, phase = "submit", error = %e, "case processing failed");
            }
        }
    }

    async fn submit_case(&self, case: &CaseRecord) -> DomainResult<()> {
        self.refresh_environment(&case.order_reference).await;

        let mut locked = self.store.load_for_update(case.id).await?;
        if locked.status != CaseStatus::WaitingSubmission {
            return self.store.save(&locked).await;
        }
        let pristine = locked.clone();

        match self.try_submit(&mut locked).await {
            Ok(()) => self.store.save(&locked).await,
            Err(e) => {
                self.release(&pristine).await;
                Err(e)
            }
        }
    }

    async fn try_submit(&self, locked: &mut CaseRecord) -> DomainResult<()> {
        let payload = self.orders.build_payload(&locked.order_reference).await?;

        match self.review.submit(&payload).await? {
            Some(code) => {
                locked.assign_external_code(code)?;
                locked.set_status(CaseStatus::InReview)?;
            }
            None => {
                // Accepted but no identifier yet: stay in
                // WaitingSubmission and retry next tick.
                debug!(case_id = %locked.id, "submission returned no identifier, will retry next tick");
            }
        }
        Ok(())
    }

    /// Phase 3: reconcile in-review cases against the remote service.
    async fn reconcile_in_review(&self, cases: Vec<CaseRecord>) {
        for case in cases {
            debug!(case_id = %case.id, order = %case.order_reference, "polling case for review update");
            if let Err(e) = self.reconcile_case(&case).await {
                error!(case_id = %case.id, phase = "reconcile", error = %e, "case processing failed");
            }
        }
    }

    async fn reconcile_case(&self, case: &CaseRecord) -> DomainResult<()> {
        self.refresh_environment(&case.order_reference).await;

        let code = case
            .external_code
            .clone()
            .ok_or(DomainError::MissingExternalCode(case.id))?;

        // Fetch before locking so a slow remote call never extends the
        // lock hold time.
        let update = self.review.fetch(&code).await?;

        let mut locked = self.store.load_for_update(case.id).await?;
        let pristine = locked.clone();

        let before = ChangeDetector::fingerprint(&locked);
        locked.apply_update(&update);
        let after = ChangeDetector::fingerprint(&locked);

        if before == after {
            info!(case_id = %locked.id, "case already up to date, no action taken");
            // The save exists solely to release the lock.
            return self.store.save(&locked).await;
        }

        if let Err(e) = self
            .orders
            .apply_case_update(&locked.order_reference, &locked)
            .await
        {
            // Release without persisting the half-applied update.
            self.release(&pristine).await;
            return Err(e);
        }

        self.store.save(&locked).await
    }

    /// Advisory environment hook; failures are logged and swallowed.
    async fn refresh_environment(&self, order_reference: &str) {
        let ctx = match self.orders.order_context(order_reference).await {
            Ok(ctx) => ctx,
            Err(e) => {
                debug!(order = %order_reference, error = %e, "no order context, skipping environment refresh");
                return;
            }
        };
        if let Err(e) = self.environment.refresh(&ctx).await {
            debug!(order = %order_reference, error = %e, "payment environment refresh failed, continuing");
        }
    }

    /// Best-effort save whose only purpose is releasing the lock after
    /// a failure.
    async fn release(&self, record: &CaseRecord) {
        if let Err(e) = self.store.save(record).await {
            warn!(case_id = %record.id, error = %e, "failed to release case lock");
        }
    }
}
