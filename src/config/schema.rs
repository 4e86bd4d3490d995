//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the governor.
//! All types derive Serde traits for deserialization from config files.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration for the request governor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GovernorConfig {
    /// Listener configuration for the host binary.
    pub listener: ListenerConfig,

    /// Client identification settings.
    pub client: ClientConfig,

    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Time-of-day access window.
    pub temporal: TemporalConfig,

    /// Role-based authorization for mutating methods.
    pub authz: AuthzConfig,

    /// Append-only request audit log.
    pub audit: AuditConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout for the application handler in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// How clients are identified.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Header carrying the original client address when behind a proxy.
    pub forwarded_header: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            forwarded_header: "X-Forwarded-For".to_string(),
        }
    }
}

/// Which record store backs the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Sharded concurrent map, one lock per shard.
    #[default]
    Sharded,
    /// One mutex around the whole map.
    GlobalLock,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum admitted requests per client per window.
    pub max_requests: u32,

    /// Trailing window length in seconds.
    pub window_seconds: u64,

    /// Path patterns counted toward the limit.
    pub scoped_paths: Vec<String>,

    /// Record store implementation.
    pub store: StoreKind,

    /// How often idle client records are purged, in seconds.
    pub purge_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_seconds: 60,
            scoped_paths: vec!["/api/messages/".to_string()],
            store: StoreKind::Sharded,
            purge_interval_secs: 60,
        }
    }
}

/// Time-of-day access configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Enable the time-of-day gate.
    pub enabled: bool,

    /// Start of the allowed window (inclusive).
    #[serde(deserialize_with = "de_time_of_day", serialize_with = "ser_time_of_day")]
    pub allowed_start: NaiveTime,

    /// End of the allowed window (inclusive).
    #[serde(deserialize_with = "de_time_of_day", serialize_with = "ser_time_of_day")]
    pub allowed_end: NaiveTime,

    /// Path patterns the window applies to.
    pub scoped_paths: Vec<String>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_start: hour_of_day(6),
            allowed_end: hour_of_day(21),
            scoped_paths: vec!["/api/".to_string()],
        }
    }
}

/// Role-based authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Enable the role gate.
    pub enabled: bool,

    /// Path patterns the rule protects.
    pub protected_paths: Vec<String>,

    /// HTTP methods subject to the role check.
    pub guarded_methods: Vec<String>,

    /// Roles permitted to use guarded methods.
    pub allowed_roles: Vec<String>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            protected_paths: vec!["/api/messages".to_string()],
            guarded_methods: vec!["PUT".into(), "PATCH".into(), "DELETE".into()],
            allowed_roles: vec!["admin".into(), "moderator".into()],
        }
    }
}

/// Audit line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditFormat {
    #[default]
    Text,
    Json,
}

/// Request audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging.
    pub enabled: bool,

    /// Destination file. `"-"` sends lines to the tracing subscriber instead.
    pub sink_path: String,

    /// Line format.
    pub format: AuditFormat,

    /// Lines buffered for the file writer before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink_path: "requests.log".to_string(),
            format: AuditFormat::Text,
            queue_capacity: 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn hour_of_day(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("hour literal is in range")
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn de_time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time_of_day(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid time of day '{}', expected HH:MM or HH:MM:SS", raw))
    })
}

fn ser_time_of_day<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format("%H:%M:%S").to_string())
}
