//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → one pinned engine per address → one monitor per address
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Reporting (reporter.rs):
//!     Periodic health summary until the shutdown signal
//!
//! Shutdown (shutdown.rs):
//!     Trigger → reporters exit → every monitor stops
//! ```
//!
//! # Design Decisions
//! - Fail fast: a monitor that cannot be built aborts startup
//! - Stopping a monitor lets a probe in flight finish, within a grace period

pub mod reporter;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reporter::report_until_shutdown;
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{start_monitors, stop_monitors};
