//! Request governance for HTTP services.
//!
//! Every inbound request is written to an audit log, then checked against a
//! time-of-day window, a per-client sliding-window rate limit, and a role
//! rule for mutating methods, in that order. The first gate that objects
//! answers the request; otherwise it reaches the application unchanged.

pub mod config;
pub mod governance;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GovernorConfig;
pub use governance::{GovernancePipeline, Identity, RequestContext, Verdict};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
