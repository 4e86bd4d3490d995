//! Client identification.
//!
//! The forwarded-address header wins over the peer address so that clients
//! behind a reverse proxy are keyed individually. Only the first hop of the
//! header is used.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName};

use crate::governance::ClientKey;

#[derive(Debug, Clone)]
pub struct ClientIdentifier {
    forwarded_header: HeaderName,
}

impl ClientIdentifier {
    pub fn new(forwarded_header: HeaderName) -> Self {
        Self { forwarded_header }
    }

    /// Derive a key from headers and the raw peer address. Never fails.
    pub fn identify(&self, headers: &HeaderMap, peer: Option<&str>) -> ClientKey {
        let forwarded = headers
            .get(&self.forwarded_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty());

        if let Some(first) = forwarded {
            return ClientKey::new(first);
        }

        match peer.map(str::trim).filter(|p| !p.is_empty()) {
            Some(peer) => ClientKey::new(strip_port(peer)),
            None => ClientKey::unknown(),
        }
    }

    /// Same as `identify`, taking the socket address a listener reports.
    pub fn identify_socket(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientKey {
        let peer = peer.map(|addr| addr.ip().to_string());
        self.identify(headers, peer.as_deref())
    }
}

impl Default for ClientIdentifier {
    fn default() -> Self {
        Self::new(HeaderName::from_static("x-forwarded-for"))
    }
}

fn strip_port(peer: &str) -> String {
    match peer.parse::<SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => peer.to_string(),
    }
}
