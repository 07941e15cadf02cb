//! Status server startup helper for embedding in a game host.
//!
//! [`spawn_status_server`] launches the server on the serving (Tokio)
//! runtime and hands its lifecycle back to the host as two
//! [`Deferred`]s: one for "listening on this address" and one for "the
//! server has stopped". The host decides when to stop by settling the
//! shutdown deferred it passed in.
//!
//! # Usage
//!
//! ```rust,ignore
//! let (stop, shutdown) = deferred::<(), Infallible>();
//! let handle = spawn_status_server(&bridge, config, state, shutdown);
//! // ... host loop, polling `handle.bound` ...
//! stop.resolve(());
//! pool.run_until(handle.finished)?;
//! ```

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::task::Spawn;
use tracing::info;

use crate::bridge::{Deferred, RuntimeBridge, deferred};
use crate::router::build_router;
use crate::server::{ServerConfig, ServerError, bind, serve};
use crate::state::AppState;

/// Host-side view of a running status server.
#[derive(Debug)]
pub struct StatusServerHandle {
    /// Settles with the bound address once the listener is open, or with
    /// the bind error.
    pub bound: Deferred<SocketAddr, ServerError>,
    /// Settles when the server has stopped.
    pub finished: Deferred<(), ServerError>,
}

/// Spawn the status server on the bridge's serving runtime.
///
/// The listener is bound, then the server blocks on `shutdown` (carried
/// across the bridge) for as long as the host keeps it open. A failed or
/// abandoned `shutdown` stops the server and settles `finished` with
/// [`ServerError::Lifecycle`].
pub fn spawn_status_server<S, E>(
    bridge: &RuntimeBridge<S>,
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: Deferred<(), E>,
) -> StatusServerHandle
where
    S: Spawn,
    E: Display + Send + 'static,
{
    let shutdown = bridge.into_serving(shutdown);
    let (bound_tx, bound) = deferred();

    let finished = bridge.into_host(async move {
        let (listener, addr) = match bind(&config).await {
            Ok(bound) => bound,
            Err(e) => {
                bound_tx.reject(e.clone());
                return Err(e);
            }
        };
        bound_tx.resolve(addr);
        info!(%addr, "Status server listening");

        serve(listener, build_router(state, config.access_log), shutdown).await
    });

    StatusServerHandle { bound, finished }
}
