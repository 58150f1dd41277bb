//! Endpoint health state.
//!
//! # States
//! - Healthy: the last probe got a 2xx, 3xx or 4xx answer
//! - Unhealthy: the last probe got a 5xx, an informational status, or failed
//!
//! # State Transitions
//! ```text
//! Healthy ←→ Unhealthy: on every probe completion, no hysteresis
//! ```
//!
//! The flag is a single `AtomicBool` so reads never lock.

use axum::http::StatusCode;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of the most recent probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl HealthState {
    /// Classify a probe response: healthy iff `200 <= status <= 499`.
    pub fn from_status(status: StatusCode) -> Self {
        if (200..=499).contains(&status.as_u16()) {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == HealthState::Healthy
    }
}

impl From<bool> for HealthState {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => f.write_str("healthy"),
            HealthState::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// Lock-free health cell shared between probes and readers.
#[derive(Debug, Default)]
pub struct HealthFlag(AtomicBool);

impl HealthFlag {
    pub fn new(state: HealthState) -> Self {
        Self(AtomicBool::new(state.is_healthy()))
    }

    pub fn load(&self) -> HealthState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: HealthState) {
        self.0.store(state.is_healthy(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        for code in [100u16, 101, 199, 500, 502, 503, 599] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(HealthState::from_status(status), HealthState::Unhealthy, "{code}");
        }
        for code in [200u16, 204, 301, 404, 429, 499] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(HealthState::from_status(status), HealthState::Healthy, "{code}");
        }
    }

    #[test]
    fn test_flag_starts_unhealthy() {
        let flag = HealthFlag::default();
        assert_eq!(flag.load(), HealthState::Unhealthy);

        flag.store(HealthState::Healthy);
        assert!(flag.load().is_healthy());
    }
}
