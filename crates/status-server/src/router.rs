//! Axum router construction for the status server.
//!
//! Assembles the three status routes into a single [`Router`] and stamps
//! permissive cross-origin headers onto every response, so status pages
//! and server lists on other origins can poll the endpoints directly.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::access_log::with_access_log;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the status server.
///
/// The router includes:
/// - `GET /` -- HTML status page
/// - `GET /json` -- game state snapshot
/// - `GET /overview` -- PNG map overview
///
/// `Access-Control-Allow-Origin: *` and
/// `Access-Control-Allow-Credentials: true` are set on every response,
/// errors included. With `access_log` set, each request is logged at
/// `info` level.
pub fn build_router(state: Arc<AppState>, access_log: bool) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/json", get(handlers::json))
        .route("/overview", get(handlers::overview))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .with_state(state);

    if access_log {
        with_access_log(router)
    } else {
        router
    }
}
