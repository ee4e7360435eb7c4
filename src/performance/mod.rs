//! Minimal manual-trace recorder used to time store start-up.
mod api;
mod error;

#[doc(inline)]
pub use api::{Performance, PerformanceTrace, TraceHandle};

#[doc(inline)]
pub use error::{invalid_argument, PerformanceError, PerformanceErrorCode, PerformanceResult};
