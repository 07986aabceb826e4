//! Optional payment-environment refresh hook.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::OrderContext;

/// Advisory hook invoked before each remote call to refresh any
/// environment-specific payment-provider state for the order's store
/// and currency.
///
/// Some payment integrations hold per-store state that goes stale in
/// background jobs and must be re-initialized before remote calls.
/// The hook is advisory: the scheduler logs and ignores its errors,
/// and deployments without such an integration wire in
/// [`NoopPaymentEnvironment`].
#[async_trait]
pub trait PaymentEnvironment: Send + Sync {
    async fn refresh(&self, ctx: &OrderContext) -> DomainResult<()>;
}

/// Default hook for deployments with no payment-provider state to
/// refresh. Always succeeds without doing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPaymentEnvironment;

#[async_trait]
impl PaymentEnvironment for NoopPaymentEnvironment {
    async fn refresh(&self, _ctx: &OrderContext) -> DomainResult<()> {
        Ok(())
    }
}
