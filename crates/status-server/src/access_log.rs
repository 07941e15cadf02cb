//! Per-request access logging.
//!
//! Enabled by `status_server.logging`. Each request gets an `access` span
//! carrying the remote address, method, URI, and user agent; when the
//! response is ready one `info` event records status and latency inside
//! that span.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, header};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};

/// Attach the access log to every route of `router`.
pub fn with_access_log(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(access_span as fn(&Request<Body>) -> Span)
            .on_response(log_response as fn(&Response<Body>, Duration, &Span)),
    )
}

fn access_span(request: &Request<Body>) -> Span {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| String::from("-"), |ConnectInfo(addr)| addr.to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "access",
        remote = %remote,
        method = %request.method(),
        url = %request.uri(),
        ua = %user_agent,
    )
}

fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let time_ms = latency.as_secs_f64() * 1_000.0;
    info!(
        status = response.status().as_u16(),
        time_ms = %format!("{time_ms:.2}"),
        "request served"
    );
}
