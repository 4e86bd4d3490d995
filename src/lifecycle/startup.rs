//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics before anything logs
//!
//! # Design Decisions
//! - Fail fast: any configuration error is fatal
//! - No config file means defaults, validated like any other config

use std::path::Path;

use crate::config::{load_config, validate_config, ConfigError, GovernorConfig};
use crate::observability::{logging, metrics};

/// Load the config at `path`, or validated defaults when there is none.
pub fn load_startup_config(path: Option<&Path>) -> Result<GovernorConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = GovernorConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Install the tracing subscriber and, if enabled, the metrics exporter.
pub fn init_observability(config: &GovernorConfig) {
    logging::init_tracing(&config.observability);

    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(_) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}
