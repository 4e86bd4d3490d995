//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limit > 0, window > 0, timeout > 0)
//! - Validate listener and metrics socket addresses
//! - Reject safe methods in the guarded set
//! - Reject path patterns that can never match
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GovernorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GovernorConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroRequestLimit,

    #[error("rate_limit.window_seconds must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.purge_interval_secs must be greater than zero")]
    ZeroPurgeInterval,

    #[error("{field}: invalid path pattern '{pattern}'")]
    InvalidPattern { field: &'static str, pattern: String },

    #[error("authz.guarded_methods: '{0}' is not a valid HTTP method")]
    InvalidMethod(String),

    #[error("authz.guarded_methods: safe method '{0}' cannot be guarded")]
    SafeMethodGuarded(String),

    #[error("authz.allowed_roles must not be empty while authz is enabled")]
    NoAllowedRoles,

    #[error("audit.sink_path must not be empty while audit is enabled")]
    EmptySinkPath,

    #[error("client.forwarded_header '{0}' is not a valid header name")]
    InvalidHeaderName(String),

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("audit.queue_capacity must be greater than zero")]
    ZeroAuditQueue,
}

/// Validate a deserialized configuration, collecting every problem.
pub fn validate_config(config: &GovernorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rate = &config.rate_limit;
    if rate.max_requests == 0 {
        errors.push(ValidationError::ZeroRequestLimit);
    }
    if rate.window_seconds == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if rate.purge_interval_secs == 0 {
        errors.push(ValidationError::ZeroPurgeInterval);
    }
    check_patterns("rate_limit.scoped_paths", &rate.scoped_paths, &mut errors);
    check_patterns("temporal.scoped_paths", &config.temporal.scoped_paths, &mut errors);

    let authz = &config.authz;
    check_patterns("authz.protected_paths", &authz.protected_paths, &mut errors);
    for raw in &authz.guarded_methods {
        match Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) if method.is_safe() => {
                errors.push(ValidationError::SafeMethodGuarded(raw.clone()));
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidMethod(raw.clone())),
        }
    }
    if authz.enabled && authz.allowed_roles.iter().all(|r| r.trim().is_empty()) {
        errors.push(ValidationError::NoAllowedRoles);
    }

    if config.audit.enabled && config.audit.sink_path.trim().is_empty() {
        errors.push(ValidationError::EmptySinkPath);
    }
    if config.audit.queue_capacity == 0 {
        errors.push(ValidationError::ZeroAuditQueue);
    }

    let header = &config.client.forwarded_header;
    if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(header.clone()));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let metrics_address = &config.observability.metrics_address;
    if metrics_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_patterns(field: &'static str, patterns: &[String], errors: &mut Vec<ValidationError>) {
    for pattern in patterns {
        let body = pattern.trim().trim_start_matches('*').trim_end_matches('*');
        if body.is_empty() || (!pattern.trim().starts_with('*') && !body.starts_with('/')) {
            errors.push(ValidationError::InvalidPattern {
                field,
                pattern: pattern.clone(),
            });
        }
    }
}
