//! Logging and metrics.
//!
//! - Structured logging with configurable formats (pretty, compact, JSON)
//! - Prometheus metrics for cleanup rounds (requires the `prometheus` feature)

pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
