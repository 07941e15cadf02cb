//! Status server for a running game server.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **JSON endpoint** (`/json`) with a point-in-time snapshot of server,
//!   map, player, and score data
//! - **HTML status page** (`GET /`) rendered with `minijinja`
//! - **Map overview** (`/overview`): a 512×512 PNG of the current map,
//!   served from an [`OverviewCache`] that re-renders only when the map
//!   changes or the refresh interval elapses
//!
//! # Architecture
//!
//! The game host owns the authoritative state and runs its own executor.
//! The status server runs on Tokio. [`RuntimeBridge`] carries single-fire
//! completions between the two so that server startup and shutdown follow
//! the host's lifecycle without either runtime blocking the other. Game
//! data is reached only through the [`GameStateProvider`] and
//! [`MapRenderer`] traits.
//!
//! [`OverviewCache`]: overview::OverviewCache
//! [`RuntimeBridge`]: bridge::RuntimeBridge
//! [`GameStateProvider`]: provider::GameStateProvider
//! [`MapRenderer`]: provider::MapRenderer

pub mod access_log;
pub mod bridge;
pub mod config;
pub mod error;
pub mod handlers;
pub mod overview;
pub mod provider;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod template;

// Re-export primary types for convenience.
pub use bridge::{BridgeError, Deferred, Pending, Resolver, RuntimeBridge, deferred};
pub use config::{ConfigError, StatusConfig, StatusServerConfig};
pub use overview::{OverviewCache, OverviewError};
pub use provider::{GameStateProvider, MapRenderer, OVERVIEW_SIZE, RenderError};
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StatusServerHandle, spawn_status_server};
pub use state::AppState;
