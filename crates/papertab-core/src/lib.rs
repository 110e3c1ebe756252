//! Papertab Core - Shared infrastructure for the papertab pipelines
//!
//! Retry policy for flaky storage, logging setup and progress reporting
//! used by both the ingestion and the curation stages.

pub mod logging;
pub mod progress;
pub mod retry;

// Re-exports for convenience
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{DEFAULT_RETRY_DELAY, RetryPolicy, Transient};
