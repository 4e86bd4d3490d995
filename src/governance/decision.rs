//! Stage decisions and the stage interface.

use std::fmt::Debug;

use axum::http::StatusCode;

use crate::governance::context::RequestContext;

/// A policy rejection. Expected and user-facing, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
    /// Seconds, rendered as a `Retry-After` header.
    pub retry_after: Option<u64>,
}

impl Rejection {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }
}

/// Result of evaluating one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Reject(Rejection),
}

impl Decision {
    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue)
    }
}

/// Points in the pipeline a request has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Logged,
    TemporalChecked,
    RateChecked,
    Authorized,
    Dispatched,
}

/// One gate in the pipeline.
pub trait Stage: Send + Sync + Debug {
    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// State the request reaches once this stage lets it through.
    fn checkpoint(&self) -> PipelineState;

    fn evaluate(&self, ctx: &RequestContext) -> Decision;
}
