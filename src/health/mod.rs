//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (monitor.rs):
//!     EndpointConfig → health URI → first probe before returning
//!     → optional fixed-rate schedule on the injected runtime
//!
//! Probe (monitor.rs):
//!     GET health URI through the engine
//!     → 200..=499 healthy, anything else or an error unhealthy
//!     → single atomic store into state.rs
//!
//! Read (monitor.rs):
//!     healthy   → return stored flag
//!     unhealthy → probe again, return fresh flag
//! ```
//!
//! # Design Decisions
//! - One monitor per resolved address, not per hostname
//! - No hysteresis: every probe decides the state on its own
//! - Health reads never take a lock

pub mod monitor;
pub mod state;

pub use monitor::{health_uri, EndpointHealthMonitor, HealthError, SHUTDOWN_GRACE};
pub use state::{HealthFlag, HealthState};
