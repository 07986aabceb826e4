//! In-memory mock adapters for testing the scheduler core.
//!
//! These honour the same locking and error contracts as the real
//! adapters, with knobs for injecting per-case failures and counters
//! for asserting how often each collaborator was touched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CasePayload, CaseRecord, CaseStatus, OrderContext, ReviewUpdate, VerificationSignals,
};
use crate::domain::ports::{CaseStore, OrderGateway, PaymentEnvironment, ReviewClient};

/// In-memory case store with claim-token locking and save counting.
#[derive(Default)]
pub struct MockCaseStore {
    cases: RwLock<HashMap<Uuid, CaseRecord>>,
    locks: RwLock<HashMap<Uuid, Uuid>>,
    save_counts: RwLock<HashMap<Uuid, u32>>,
    fail_save: RwLock<HashSet<Uuid>>,
}

impl MockCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a case. Pretends it was created by the out-of-scope
    /// creation path.
    pub async fn insert(&self, case: CaseRecord) {
        self.cases.write().await.insert(case.id, case);
    }

    /// Make every `save` of this case fail with a write error.
    pub async fn fail_save_for(&self, id: Uuid) {
        self.fail_save.write().await.insert(id);
    }

    /// Current persisted state of a case.
    pub async fn get(&self, id: Uuid) -> Option<CaseRecord> {
        self.cases.read().await.get(&id).cloned()
    }

    /// How many times `save` was invoked for this case.
    pub async fn save_count(&self, id: Uuid) -> u32 {
        self.save_counts.read().await.get(&id).copied().unwrap_or(0)
    }

    /// Whether a claim is currently outstanding for this case.
    pub async fn is_locked(&self, id: Uuid) -> bool {
        self.locks.read().await.contains_key(&id)
    }
}

#[async_trait]
impl CaseStore for MockCaseStore {
    async fn find_by_status(&self, status: CaseStatus) -> DomainResult<Vec<CaseRecord>> {
        let mut matching: Vec<CaseRecord> = self
            .cases
            .read()
            .await
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);
        Ok(matching)
    }

    async fn load_for_update(&self, id: Uuid) -> DomainResult<CaseRecord> {
        let mut locks = self.locks.write().await;
        if locks.contains_key(&id) {
            // No waiting in the mock: contention times out immediately.
            return Err(DomainError::LockTimeout { case_id: id, waited_ms: 0 });
        }
        let mut record = self
            .cases
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DomainError::CaseNotFound(id))?;
        let token = Uuid::new_v4();
        record.lock_token = Some(token);
        locks.insert(id, token);
        Ok(record)
    }

    async fn save(&self, record: &CaseRecord) -> DomainResult<()> {
        *self.save_counts.write().await.entry(record.id).or_insert(0) += 1;

        if self.fail_save.read().await.contains(&record.id) {
            return Err(DomainError::Write("injected save failure".to_string()));
        }

        let mut locks = self.locks.write().await;
        match (locks.get(&record.id), record.lock_token) {
            (Some(held), Some(token)) if *held == token => {}
            _ => return Err(DomainError::LockConflict(record.id)),
        }
        locks.remove(&record.id);

        let mut persisted = record.clone();
        persisted.lock_token = None;
        self.cases.write().await.insert(record.id, persisted);
        Ok(())
    }
}

/// Configured outcome of a `submit` call, keyed by order reference.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Service assigned an external code.
    Code(String),
    /// Service accepted but deferred the identifier.
    NoCode,
    /// Transport/protocol failure.
    Fail(String),
}

/// Scriptable review-service client.
#[derive(Default)]
pub struct MockReviewClient {
    submit_outcomes: RwLock<HashMap<String, SubmitOutcome>>,
    fetch_responses: RwLock<HashMap<String, ReviewUpdate>>,
    fail_fetch: RwLock<HashSet<String>>,
    submit_calls: RwLock<Vec<String>>,
}

impl MockReviewClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn on_submit(&self, order_reference: impl Into<String>, outcome: SubmitOutcome) {
        self.submit_outcomes
            .write()
            .await
            .insert(order_reference.into(), outcome);
    }

    pub async fn on_fetch(&self, external_code: impl Into<String>, update: ReviewUpdate) {
        self.fetch_responses
            .write()
            .await
            .insert(external_code.into(), update);
    }

    pub async fn fail_fetch_for(&self, external_code: impl Into<String>) {
        self.fail_fetch.write().await.insert(external_code.into());
    }

    /// Order references submitted so far, in call order.
    pub async fn submitted(&self) -> Vec<String> {
        self.submit_calls.read().await.clone()
    }
}

#[async_trait]
impl ReviewClient for MockReviewClient {
    async fn submit(&self, payload: &CasePayload) -> DomainResult<Option<String>> {
        self.submit_calls
            .write()
            .await
            .push(payload.order_reference.clone());
        match self.submit_outcomes.read().await.get(&payload.order_reference) {
            Some(SubmitOutcome::Code(code)) => Ok(Some(code.clone())),
            Some(SubmitOutcome::Fail(message)) => Err(DomainError::Submission(message.clone())),
            Some(SubmitOutcome::NoCode) | None => Ok(None),
        }
    }

    async fn fetch(&self, external_code: &str) -> DomainResult<ReviewUpdate> {
        if self.fail_fetch.read().await.contains(external_code) {
            return Err(DomainError::Transport("injected fetch failure".to_string()));
        }
        self.fetch_responses
            .read()
            .await
            .get(external_code)
            .cloned()
            .ok_or_else(|| DomainError::RemoteCaseNotFound(external_code.to_string()))
    }
}

/// Scriptable order gateway with an update-call ledger.
#[derive(Default)]
pub struct MockOrderGateway {
    signals: RwLock<HashMap<String, VerificationSignals>>,
    payload_fields: RwLock<HashMap<String, CasePayload>>,
    fail_signals: RwLock<HashSet<String>>,
    fail_updates: RwLock<HashSet<String>>,
    update_calls: RwLock<Vec<String>>,
}

impl MockOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_signals(&self, order_reference: impl Into<String>, signals: VerificationSignals) {
        self.signals.write().await.insert(order_reference.into(), signals);
    }

    pub async fn fail_signals_for(&self, order_reference: impl Into<String>) {
        self.fail_signals.write().await.insert(order_reference.into());
    }

    pub async fn fail_update_for(&self, order_reference: impl Into<String>) {
        self.fail_updates.write().await.insert(order_reference.into());
    }

    /// Order references that received a case update, in call order.
    pub async fn updated(&self) -> Vec<String> {
        self.update_calls.read().await.clone()
    }
}

#[async_trait]
impl OrderGateway for MockOrderGateway {
    async fn verification_signals(
        &self,
        order_reference: &str,
    ) -> DomainResult<VerificationSignals> {
        if self.fail_signals.read().await.contains(order_reference) {
            return Err(DomainError::OrderNotFound(order_reference.to_string()));
        }
        Ok(self
            .signals
            .read()
            .await
            .get(order_reference)
            .cloned()
            .unwrap_or_default())
    }

    async fn order_context(&self, _order_reference: &str) -> DomainResult<OrderContext> {
        Ok(OrderContext {
            store_id: "1".to_string(),
            currency: "USD".to_string(),
        })
    }

    async fn build_payload(&self, order_reference: &str) -> DomainResult<CasePayload> {
        Ok(self
            .payload_fields
            .read()
            .await
            .get(order_reference)
            .cloned()
            .unwrap_or_else(|| CasePayload {
                order_reference: order_reference.to_string(),
                fields: std::collections::BTreeMap::new(),
            }))
    }

    async fn apply_case_update(
        &self,
        order_reference: &str,
        _case: &CaseRecord,
    ) -> DomainResult<()> {
        self.update_calls.write().await.push(order_reference.to_string());
        if self.fail_updates.read().await.contains(order_reference) {
            return Err(DomainError::Write("injected order update failure".to_string()));
        }
        Ok(())
    }
}

/// Environment hook that counts refreshes and can be made to fail.
#[derive(Default)]
pub struct RecordingEnvironment {
    refreshes: AtomicU32,
    fail: bool,
}

impl RecordingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook that always errors, for asserting the scheduler treats
    /// it as advisory.
    pub fn failing() -> Self {
        Self { refreshes: AtomicU32::new(0), fail: true }
    }

    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentEnvironment for RecordingEnvironment {
    async fn refresh(&self, _ctx: &OrderContext) -> DomainResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::Transport("environment unavailable".to_string()));
        }
        Ok(())
    }
}

/// Convenience bundle wiring all mocks into `Arc`s.
pub struct MockHarness {
    pub store: Arc<MockCaseStore>,
    pub review: Arc<MockReviewClient>,
    pub orders: Arc<MockOrderGateway>,
    pub environment: Arc<RecordingEnvironment>,
}

impl Default for MockHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MockCaseStore::new()),
            review: Arc::new(MockReviewClient::new()),
            orders: Arc::new(MockOrderGateway::new()),
            environment: Arc::new(RecordingEnvironment::new()),
        }
    }
}
