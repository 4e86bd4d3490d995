//! Rendering of pipeline rejections.
//!
//! A rejection becomes a plain-text response carrying its status and
//! message. Rate-limit rejections also carry `Retry-After` in seconds.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::governance::Rejection;

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.message).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
