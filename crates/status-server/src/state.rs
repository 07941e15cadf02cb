//! Shared application state for the status server.
//!
//! [`AppState`] is built once at startup from the host's collaborators and
//! the resolved [`StatusConfig`], wrapped in an [`Arc`], and injected into
//! every handler via Axum's `State` extractor.

use std::sync::Arc;

use crate::config::StatusConfig;
use crate::overview::OverviewCache;
use crate::provider::{GameStateProvider, MapRenderer};
use crate::template::{StatusPage, TemplateError};

/// Shared state for the Axum application.
pub struct AppState {
    /// Live game state, read on every request.
    pub game: Arc<dyn GameStateProvider>,
    /// Cached map overview served by `GET /overview`.
    pub overview: OverviewCache,
    /// Compiled status page template.
    pub page: StatusPage,
    /// Script names reported alongside the game state.
    pub scripts: Vec<String>,
}

impl AppState {
    /// Create the application state with an empty overview cache.
    ///
    /// # Errors
    ///
    /// Returns a template error if the embedded status page fails to compile.
    pub fn new(
        game: Arc<dyn GameStateProvider>,
        renderer: Arc<dyn MapRenderer>,
        config: &StatusConfig,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            overview: OverviewCache::new(
                Arc::clone(&game),
                renderer,
                config.status_server.update_interval,
            ),
            game,
            page: StatusPage::new()?,
            scripts: config.scripts.clone(),
        })
    }
}
