//! Trace ID propagation.
//!
//! An inbound `X-Trace-Id` is kept; otherwise a UUID v4 is generated and
//! written into the request headers so inner middleware and handlers log the
//! same value. Either way it is echoed on the response.

use axum::http::HeaderName;
use tower::layer::util::Stack;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::request::X_TRACE_ID;

pub type TraceIdLayer = Stack<PropagateRequestIdLayer, SetRequestIdLayer<MakeRequestUuid>>;

pub fn trace_id_layer() -> TraceIdLayer {
    let header = HeaderName::from_static(X_TRACE_ID);
    Stack::new(
        PropagateRequestIdLayer::new(header.clone()),
        SetRequestIdLayer::new(header, MakeRequestUuid),
    )
}
