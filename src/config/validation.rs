//! Configuration validation.
//!
//! Serde handles syntax; this module checks values the types cannot
//! express. Every problem is reported, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint #{index} has an empty hostname")]
    EmptyHostname { index: usize },

    #[error("endpoint '{name}' health path '{path}' must start with '/'")]
    RelativeHealthPath { name: String, path: String },

    #[error("endpoint name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("endpoint '{0}' has no addresses")]
    NoAddresses(String),

    #[error("connector pipe buffer must be greater than zero")]
    ZeroPipeBuffer,
}

/// Validate a configuration. Pure function, no I/O.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.hostname.trim().is_empty() {
            errors.push(ValidationError::EmptyHostname { index });
        }
        if !endpoint.health_path.is_empty() && !endpoint.health_path.starts_with('/') {
            errors.push(ValidationError::RelativeHealthPath {
                name: endpoint.name.clone(),
                path: endpoint.health_path.clone(),
            });
        }
        if !names.insert(endpoint.name.as_str()) {
            errors.push(ValidationError::DuplicateName(endpoint.name.clone()));
        }
        if endpoint.addresses.is_empty() {
            errors.push(ValidationError::NoAddresses(endpoint.name.clone()));
        }
    }

    if config.connector.pipe_buffer_bytes == 0 {
        errors.push(ValidationError::ZeroPipeBuffer);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EndpointConfig;

    fn endpoint(name: &str) -> EndpointConfig {
        let mut endpoint = EndpointConfig::new("api.example.com");
        endpoint.name = name.to_string();
        endpoint.addresses = vec!["10.0.0.5".parse().unwrap()];
        endpoint
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = ClientConfig::default();
        config.endpoints.push(endpoint("a"));
        config.endpoints.push(endpoint("b"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = ClientConfig::default();
        let mut bad = endpoint("a");
        bad.hostname = " ".to_string();
        bad.health_path = "health".to_string();
        bad.addresses.clear();
        config.endpoints.push(bad);
        config.endpoints.push(endpoint("a"));
        config.connector.pipe_buffer_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHostname { index: 0 },
                ValidationError::RelativeHealthPath {
                    name: "a".into(),
                    path: "health".into()
                },
                ValidationError::NoAddresses("a".into()),
                ValidationError::DuplicateName("a".into()),
                ValidationError::ZeroPipeBuffer,
            ]
        );
    }
}
