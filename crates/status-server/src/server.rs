//! Status HTTP server lifecycle management.
//!
//! [`bind`] opens the listener and [`serve`] runs the Axum server on it
//! until a shutdown signal settles. The shutdown signal is any future
//! yielding an [`Outcome`], normally the [`Pending`](crate::bridge::Pending)
//! side of the host's shutdown [`Deferred`](crate::bridge::Deferred).

use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use crate::bridge::Outcome;
use crate::config::StatusServerConfig;

/// Configuration for the status server listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// Whether to log every request.
    pub access_log: bool,
}

impl From<&StatusServerConfig> for ServerConfig {
    fn from(config: &StatusServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            access_log: config.logging,
        }
    }
}

/// Errors that can occur when starting or running the status server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),

    /// The host's lifecycle signal failed or was abandoned.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

/// Bind the configured address and report the actual local address.
///
/// `host` may be an IP literal or a resolvable name. Port `0` picks a
/// free port, which the returned address reflects.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be resolved or bound.
pub async fn bind(config: &ServerConfig) -> Result<(TcpListener, SocketAddr), ServerError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            ServerError::Bind(format!("bind failed on {}:{}: {e}", config.host, config.port))
        })?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;
    Ok((listener, addr))
}

/// Serve `router` on `listener` until `shutdown` settles.
///
/// In-flight requests are drained before returning.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error, or
/// [`ServerError::Lifecycle`] if `shutdown` settled with a failure or was
/// aborted. The server stops in every case.
pub async fn serve<F, E>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = Outcome<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let signal = async move {
        let outcome = shutdown.await;
        let _ = outcome_tx.send(outcome);
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .await
    .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    match outcome_rx.await {
        Ok(Ok(())) => {
            info!("Status server stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(ServerError::Lifecycle(format!("shutdown signal: {e}"))),
        Err(e) => Err(ServerError::Lifecycle(format!(
            "server stopped without a shutdown signal: {e}"
        ))),
    }
}
