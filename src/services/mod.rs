//! Service layer: the reconciliation core and its interval driver.

pub mod change_detector;
pub mod retry_daemon;
pub mod retry_scheduler;

pub use change_detector::ChangeDetector;
pub use retry_daemon::{DaemonConfig, DaemonHandle, RetryDaemon};
pub use retry_scheduler::RetryScheduler;
