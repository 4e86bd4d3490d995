//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use request_governor::governance::{GovernancePipeline, Identity, ManualClock};
use request_governor::{GovernorConfig, HttpServer};
use tower::ServiceExt;

/// A config with audit logging off, so tests do not write `requests.log`.
pub fn quiet_config() -> GovernorConfig {
    let mut config = GovernorConfig::default();
    config.audit.enabled = false;
    config
}

pub fn local(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

/// Application standing in for the real handlers: echoes method and path.
pub fn echo_app() -> Router {
    Router::new().fallback(|method: Method, uri: axum::http::Uri| async move {
        format!("handled {} {}", method, uri.path())
    })
}

/// Build a governed router on a manual clock.
pub fn governed(config: GovernorConfig, clock: Arc<ManualClock>) -> (Router, Arc<GovernancePipeline>) {
    let pipeline = Arc::new(GovernancePipeline::from_config_with_clock(&config, clock).unwrap());
    let server = HttpServer::with_pipeline(config, pipeline.clone(), echo_app());
    (server.router(), pipeline)
}

pub struct Sent {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Drive one request through the router in-process.
pub async fn send(
    router: &Router,
    method: Method,
    path: &str,
    client: &str,
    identity: Option<Identity>,
) -> Sent {
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header("X-Forwarded-For", client)
        .body(Body::empty())
        .unwrap();
    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Sent {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}
