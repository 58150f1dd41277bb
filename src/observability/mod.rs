//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health probes and connector requests produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, daemon only, off by default)
//! ```
//!
//! # Design Decisions
//! - Every probe outcome is logged: info on an answer, warn on a failure
//! - Metrics are cheap (atomic increments) and recorder-agnostic

pub mod logging;
pub mod metrics;
