//! Push-based observability for the GHG risk engine
//!
//! Metrics are collected in-process and written out by the binary in
//! Prometheus text format. There is no HTTP server.

pub mod metrics;

pub use metrics::Metrics;
