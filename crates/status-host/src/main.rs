//! Demo game host that embeds the status server.
//!
//! The host owns a single-threaded game loop driven by a
//! `futures::executor::LocalPool`. The status server runs on a separate
//! multi-threaded Tokio runtime. The two talk only through a
//! [`RuntimeBridge`]: the host hands the server a shutdown deferred and
//! gets back deferreds for "bound" and "finished".
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `status-config.yaml`
//! 3. Build the serving runtime and the host pool
//! 4. Create the game world and the status server state
//! 5. Spawn the status server across the bridge
//! 6. Run the game loop until Ctrl-C
//! 7. Stop the status server and wait for it

mod config;
mod error;
mod world;

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use futures::FutureExt as _;
use futures::executor::LocalPool;
use status_server::{
    AppState, GameStateProvider, MapRenderer, RuntimeBridge, ServerConfig, StatusConfig,
    StatusServerHandle, deferred, spawn_status_server,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::GameConfig;
use crate::error::HostError;
use crate::world::World;

const CONFIG_PATH: &str = "status-config.yaml";

fn main() -> Result<(), HostError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("status-host starting");

    // 2. Load configuration.
    let path = Path::new(CONFIG_PATH);
    let status_config = StatusConfig::load(path)?;
    let game_config = GameConfig::load(path)?;
    info!(
        host = %status_config.status_server.host,
        port = status_config.status_server.port,
        update_interval_secs = status_config.status_server.update_interval.as_secs(),
        maps = game_config.maps.len(),
        "Configuration loaded"
    );

    // 3. Serving runtime and host pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("status-server")
        .enable_all()
        .build()?;
    let mut pool = LocalPool::new();
    let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

    // 4. World and server state.
    let tick_interval = Duration::from_millis(game_config.tick_interval_ms);
    let startup_timeout = Duration::from_secs(game_config.startup_timeout_secs);
    let world = Arc::new(World::new(game_config, rand::random())?);
    let state = Arc::new(AppState::new(
        Arc::clone(&world) as Arc<dyn GameStateProvider>,
        Arc::clone(&world) as Arc<dyn MapRenderer>,
        &status_config,
    )?);

    // 5. Status server.
    let (stop, shutdown) = deferred::<(), Infallible>();
    let StatusServerHandle { bound, finished } = spawn_status_server(
        &bridge,
        ServerConfig::from(&status_config.status_server),
        state,
        shutdown,
    );
    let mut bound = Some(bound);
    let mut finished = Some(finished);
    let mut interrupt = Some(bridge.into_host(async { tokio::signal::ctrl_c().await }));

    // 6. Game loop.
    let started = Instant::now();
    loop {
        pool.run_until_stalled();

        if let Some(result) = poll_ready(&mut interrupt) {
            match result {
                Ok(()) => {
                    info!(tick = world.current_tick(), "Interrupt received, shutting down");
                    break;
                }
                Err(e) => warn!(error = %e, "Ctrl-C handler unavailable"),
            }
        }

        if let Some(result) = poll_ready(&mut bound) {
            let addr = result.map_err(|e| HostError::StatusServer {
                message: format!("failed to start: {e}"),
            })?;
            info!(%addr, "Status page available");
        } else if bound.is_some() && started.elapsed() > startup_timeout {
            return Err(HostError::StatusServer {
                message: format!("not listening after {}s", startup_timeout.as_secs()),
            });
        }

        if let Some(result) = poll_ready(&mut finished) {
            let message = match result {
                Ok(()) => String::from("stopped unexpectedly"),
                Err(e) => e.to_string(),
            };
            return Err(HostError::StatusServer { message });
        }

        world.tick();
        thread::sleep(tick_interval);
    }

    // 7. Stop the server.
    if !stop.resolve(()) {
        warn!("Status server stopped before the shutdown signal");
    }
    if let Some(finished) = finished {
        pool.run_until(finished).map_err(|e| HostError::StatusServer {
            message: e.to_string(),
        })?;
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
    info!("status-host stopped");
    Ok(())
}

/// Take the output of a host-side future if it is already complete.
fn poll_ready<F: Future + Unpin>(slot: &mut Option<F>) -> Option<F::Output> {
    let output = slot.as_mut()?.now_or_never()?;
    *slot = None;
    Some(output)
}
