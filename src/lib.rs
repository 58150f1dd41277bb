//! Resilient HTTP client plumbing.
//!
//! Health monitoring for individually resolved addresses of a hostname,
//! and a request connector that runs client requests on a shared
//! asynchronous HTTP engine.

pub mod config;
pub mod connector;
pub mod engine;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ClientConfig;
pub use connector::{Connector, EngineConnector};
pub use engine::{HttpEngine, HyperEngine};
pub use health::EndpointHealthMonitor;
pub use lifecycle::Shutdown;
