//! Shared type definitions for the game server status service.
//!
//! The host process produces these values and the status server only
//! reads them. Every struct serializes with the camel-cased field names
//! that the `/json` endpoint exposes.
//!
//! # Modules
//!
//! - [`ids`] -- Map identity, the implicit key of the overview cache
//! - [`structs`] -- Point-in-time server, map, player, and score snapshots

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::MapIdentity;
pub use structs::{GameStateSnapshot, MapInfo, PlayerStatus, TeamScores};
