//! Governance middleware.
//! Runs the pipeline in front of the application router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::governance::{GovernancePipeline, Verdict};

pub async fn governance_middleware(
    State(pipeline): State<Arc<GovernancePipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Absent when the router is driven without a listener, e.g. in tests.
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let ctx = pipeline.context_for(&request, peer);
    match pipeline.evaluate(&ctx) {
        Verdict::Dispatch => next.run(request).await,
        Verdict::Rejected { rejection, .. } => rejection.into_response(),
    }
}
