//! Casewatch - fraud-review case reconciliation
//!
//! Casewatch advances the lifecycle of fraud-review cases created for
//! e-commerce orders against a remote review service, on a recurring
//! schedule: it promotes stalled cases, submits eligible ones, polls
//! for remote verdicts, and propagates material changes back onto the
//! order - tolerating partial failure of any single case without
//! blocking the batch.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): case and order models, errors, and
//!   the collaborator ports
//! - **Service Layer** (`services`): the three-phase retry scheduler,
//!   change detection, and the interval daemon
//! - **Adapter Layer** (`adapters`): SQLite persistence, the HTTP
//!   review client, and in-memory test mocks
//! - **Infrastructure Layer** (`infrastructure`): configuration loading

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    CasePayload, CaseRecord, CaseStatus, Config, OrderContext, ReviewUpdate, VerificationSignals,
};
pub use domain::ports::{
    CaseStore, NoopPaymentEnvironment, OrderGateway, PaymentEnvironment, ReviewClient,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ChangeDetector, DaemonConfig, RetryDaemon, RetryScheduler};
