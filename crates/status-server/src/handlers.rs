//! HTTP endpoint handlers for the status server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | HTML status page |
//! | `GET` | `/json` | Game state snapshot plus configured scripts |
//! | `GET` | `/overview` | PNG overview of the current map (cached) |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use status_types::GameStateSnapshot;

use crate::error::StatusError;
use crate::overview::OVERVIEW_CONTENT_TYPE;
use crate::state::AppState;

/// Body of `GET /json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusReport {
    /// The game state snapshot, inlined at the top level.
    #[serde(flatten)]
    pub state: GameStateSnapshot,
    /// Scripts loaded by the game server.
    pub scripts: Vec<String>,
}

// ---------------------------------------------------------------------------
// GET /json
// ---------------------------------------------------------------------------

/// Return the current game state as JSON.
pub async fn json(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    Json(StatusReport {
        state: state.game.snapshot(),
        scripts: state.scripts.clone(),
    })
}

// ---------------------------------------------------------------------------
// GET /overview
// ---------------------------------------------------------------------------

/// Serve the map overview, re-rendering it first if the cached copy is stale.
pub async fn overview(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, StatusError> {
    let bytes = state.overview.get().await?;
    Ok(([(header::CONTENT_TYPE, OVERVIEW_CONTENT_TYPE)], bytes))
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Render the HTML status page.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, StatusError> {
    let snapshot = state.game.snapshot();
    Ok(Html(state.page.render(&snapshot, &state.scripts)?))
}
