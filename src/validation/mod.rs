//! Network validation of canonical URLs
//!
//! This module performs the actual checks: admission through the per-host
//! limiter, HTTP probing with manual redirect handling, retry with backoff
//! and the task pool that runs one check per distinct URL.

pub mod limiter;
pub mod outcome;
pub mod pool;
pub mod probe;
pub mod retry;

// Re-export commonly used items
pub use limiter::{AcquireError, HostLimiter, HostPermit};
pub use outcome::{CheckOutcome, FailureKind, RedirectHop, TlsFailure, TlsInfo};
pub use pool::{Finished, WorkerPool};
pub use probe::{HttpProbe, Probe};
pub use retry::{RetryDecision, RetryPolicy};
