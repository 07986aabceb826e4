//! Ports (trait boundaries) between the scheduler core and its
//! collaborators.

pub mod case_store;
pub mod environment;
pub mod order_gateway;
pub mod review_client;

pub use case_store::CaseStore;
pub use environment::{NoopPaymentEnvironment, PaymentEnvironment};
pub use order_gateway::OrderGateway;
pub use review_client::ReviewClient;
