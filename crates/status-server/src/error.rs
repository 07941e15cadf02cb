//! Error types for the status HTTP surface.
//!
//! [`StatusError`] unifies the per-request failure modes into a single enum
//! that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. None of
//! these are fatal to the server: each one fails only the request that hit it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::overview::OverviewError;

/// Errors that can occur while handling a status request.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// Rendering or encoding the map overview failed.
    #[error("overview unavailable: {0}")]
    Overview(#[from] OverviewError),

    /// The status page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Overview(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Template(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("status page error: {e}"),
            ),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
