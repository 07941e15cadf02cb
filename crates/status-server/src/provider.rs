//! Collaborator traits implemented by the game host.
//!
//! The status server never touches game state directly. It asks a
//! [`GameStateProvider`] for point-in-time snapshots and a [`MapRenderer`]
//! for overview pixels. Both are object-safe so the server can hold them
//! as `Arc<dyn ...>` without being generic over the host.

use futures::future::BoxFuture;
use image::RgbaImage;
use status_types::{GameStateSnapshot, MapIdentity};

/// Width and height, in pixels, of every rendered overview.
pub const OVERVIEW_SIZE: u32 = 512;

/// Error raised by a [`MapRenderer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("map render failed: {message}")]
pub struct RenderError {
    /// Description of the failure.
    pub message: String,
}

impl RenderError {
    /// Create a render error from a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read-only access to the live game state.
pub trait GameStateProvider: Send + Sync {
    /// Identity of the map that is loaded right now.
    fn current_map(&self) -> MapIdentity;

    /// Point-in-time snapshot of server, player, map, and score data.
    fn snapshot(&self) -> GameStateSnapshot;
}

/// Produces a top-down RGBA overview of the current map.
///
/// Implementations may finish synchronously (return
/// `futures::future::ready(..).boxed()`) or suspend mid-render; the
/// overview cache serializes calls either way. The image is expected to
/// be [`OVERVIEW_SIZE`] pixels square.
pub trait MapRenderer: Send + Sync {
    /// Render the current map.
    fn render(&self) -> BoxFuture<'_, Result<RgbaImage, RenderError>>;
}
