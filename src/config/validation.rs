//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate service names and backend URLs
//! - Validate value ranges (timeouts > 0, pool sizes > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::ProxyConfig;
use crate::routing::service_map::{check_entry, ServiceMapError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Service(#[from] ServiceMapError),

    #[error("no services configured")]
    NoServices,

    #[error("`{field}` is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("path_prefix `{0}` must start with '/' and contain none of `?#{{}}`")]
    InvalidPrefix(String),

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error("`{0}` exceeds the largest supported limit")]
    TooLarge(&'static str),

    #[error("`timeouts.connect_secs` must not exceed `timeouts.request_secs`")]
    ConnectExceedsRequest,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }
    for (name, url) in &config.services {
        if let Err(e) = check_entry(name, url) {
            errors.push(e.into());
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let prefix = &config.listener.path_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.contains(['?', '#', '{', '}'])) {
        errors.push(ValidationError::InvalidPrefix(prefix.clone()));
    }

    let positive = [
        ("timeouts.connect_secs", config.timeouts.connect_secs as usize),
        ("timeouts.request_secs", config.timeouts.request_secs as usize),
        ("timeouts.idle_secs", config.timeouts.idle_secs as usize),
        ("pool.max_connections", config.pool.max_connections),
        ("pool.max_connections_per_backend", config.pool.max_connections_per_backend),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    let limits = [
        ("pool.max_connections", config.pool.max_connections),
        ("pool.max_connections_per_backend", config.pool.max_connections_per_backend),
    ];
    for (field, value) in limits {
        if value > Semaphore::MAX_PERMITS {
            errors.push(ValidationError::TooLarge(field));
        }
    }

    if config.timeouts.connect_secs > config.timeouts.request_secs {
        errors.push(ValidationError::ConnectExceedsRequest);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
