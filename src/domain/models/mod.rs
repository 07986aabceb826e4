//! Domain models.

pub mod case;
pub mod config;
pub mod order;

pub use case::{CaseRecord, CaseStatus};
pub use config::{Config, DatabaseConfig, LoggingConfig, ReviewServiceConfig, SchedulerConfig};
pub use order::{CasePayload, OrderContext, ReviewUpdate, VerificationSignals};
