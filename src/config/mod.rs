//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GovernorConfig (validated, immutable)
//!     → consumed once by GovernancePipeline::from_config
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuditConfig, AuditFormat, AuthzConfig, ClientConfig, GovernorConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, StoreKind, TemporalConfig,
};
pub use validation::{validate_config, ValidationError};
