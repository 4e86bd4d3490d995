//! Per-request input to the governance stages.

use std::fmt;
use std::time::Instant;

use axum::http::Method;
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Opaque client identity used as the rate-limit key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(String);

impl ClientKey {
    /// Key used when nothing identifies the client.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Authenticated principal attached by an upstream authentication layer.
///
/// Insert it into the request extensions before the governance middleware
/// runs; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub is_authenticated: bool,
    pub username: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn authenticated(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            username: Some(username.into()),
            role: Some(role.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Name written to the audit log.
    pub fn display_name(&self) -> &str {
        match (&self.username, self.is_authenticated) {
            (Some(name), true) => name,
            _ => "Anonymous",
        }
    }
}

/// Everything a stage may look at for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: Method,
    pub path: String,
    pub client: ClientKey,
    pub identity: Option<Identity>,
    /// Monotonic arrival time, used for window arithmetic.
    pub arrived_at: Instant,
    /// Local wall-clock arrival time, used for time-of-day checks and logs.
    pub local_time: NaiveDateTime,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        client: ClientKey,
        arrived_at: Instant,
        local_time: NaiveDateTime,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method,
            path: path.into(),
            client,
            identity: None,
            arrived_at,
            local_time,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn user_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(Identity::display_name)
            .unwrap_or("Anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(Identity::authenticated("alice", "admin").display_name(), "alice");
        assert_eq!(Identity::anonymous().display_name(), "Anonymous");

        let unauthenticated = Identity {
            is_authenticated: false,
            username: Some("mallory".into()),
            role: Some("admin".into()),
        };
        assert_eq!(unauthenticated.display_name(), "Anonymous");
    }

    #[test]
    fn test_unknown_client_key() {
        assert_eq!(ClientKey::unknown().as_str(), "unknown");
        assert_eq!(ClientKey::from("1.2.3.4").to_string(), "1.2.3.4");
    }
}
