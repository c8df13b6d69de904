//! Metrics for TLS profile and DSN construction
//!
//! Recorded through the `metrics` facade. The library installs no
//! recorder; without one every call is a no-op.

pub mod counters;
pub mod labels;
