//! Port onto the order/payment platform.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CasePayload, CaseRecord, OrderContext, VerificationSignals};

/// Gateway port for everything the scheduler needs from the order side:
/// verification signals for the promotion decision, store/currency
/// context for the environment hook, payload construction for
/// submission, and propagation of a changed review verdict back onto
/// the order.
///
/// The first three are pure queries; `apply_case_update` is the only
/// command, and it mutates the order, never the case.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// AVS/CVV verification results for the order, if received yet.
    async fn verification_signals(
        &self,
        order_reference: &str,
    ) -> DomainResult<VerificationSignals>;

    /// Store and currency context, consumed by the payment
    /// environment hook.
    async fn order_context(&self, order_reference: &str) -> DomainResult<OrderContext>;

    /// Derive the outbound case payload from current order data.
    async fn build_payload(&self, order_reference: &str) -> DomainResult<CasePayload>;

    /// Propagate a materially changed case onto the order.
    async fn apply_case_update(
        &self,
        order_reference: &str,
        case: &CaseRecord,
    ) -> DomainResult<()>;
}
