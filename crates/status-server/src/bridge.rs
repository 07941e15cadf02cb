//! Bridging single-fire completions between the host runtime and the
//! serving runtime.
//!
//! The game host drives its own cooperative executor (any
//! [`futures::task::Spawn`] implementation, typically a
//! [`futures::executor::LocalPool`] ticked from the game loop). The status
//! server runs on Tokio. Neither scheduler can poll the other's tasks, so
//! every value that crosses the boundary is carried by a forwarding task
//! spawned on the side that owns the source value:
//!
//! - [`RuntimeBridge::into_serving`] turns a host [`Deferred`] into a
//!   Tokio-awaitable [`Pending`].
//! - [`RuntimeBridge::into_host`] runs a Tokio future and exposes its
//!   result to the host as a [`Deferred`].
//!
//! Both directions deliver exactly one of {value, failure, abort} exactly
//! once. No retries, no buffering, and no cancellation propagation.

use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot as host_oneshot;
use futures::task::{Spawn, SpawnExt};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::warn;

/// Failure observed by the side awaiting a bridged completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError<E> {
    /// The producing side settled the completion with a failure.
    #[error("bridged operation failed: {0}")]
    Failed(E),

    /// The completion can never settle: its resolver was dropped, or the
    /// runtime that should have forwarded it is gone.
    #[error("bridged operation was aborted before it resolved")]
    Aborted,
}

/// Result of awaiting a bridged completion.
pub type Outcome<T, E> = Result<T, BridgeError<E>>;

/// Create a linked [`Resolver`] / [`Deferred`] pair.
pub fn deferred<T, E>() -> (Resolver<T, E>, Deferred<T, E>) {
    let (tx, rx) = host_oneshot::channel();
    (Resolver { tx }, Deferred { rx })
}

/// Settles the paired [`Deferred`]. Consumed on use, so a completion
/// can only ever be delivered once.
pub struct Resolver<T, E> {
    tx: host_oneshot::Sender<Result<T, E>>,
}

impl<T, E> Resolver<T, E> {
    /// Settle with a value. Returns `false` if nobody is listening anymore.
    pub fn resolve(self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with a failure. Returns `false` if nobody is listening anymore.
    pub fn reject(self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Settle with either outcome.
    pub fn settle(self, result: Result<T, E>) -> bool {
        self.tx.send(result).is_ok()
    }

    /// Whether the paired [`Deferred`] has been dropped.
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("canceled", &self.tx.is_canceled())
            .finish()
    }
}

/// Host-side single-fire completion.
///
/// Awaitable from any executor, but in practice awaited on the host's
/// executor or handed to [`RuntimeBridge::into_serving`].
#[must_use = "a deferred does nothing unless awaited or bridged"]
pub struct Deferred<T, E> {
    rx: host_oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Deferred<T, E> {
    /// A deferred that is already settled with `value`.
    pub fn resolved(value: T) -> Self {
        let (resolver, deferred) = deferred();
        resolver.resolve(value);
        deferred
    }

    /// A deferred that is already settled with `error`.
    pub fn rejected(error: E) -> Self {
        let (resolver, deferred) = deferred();
        resolver.reject(error);
        deferred
    }
}

impl<T, E> Future for Deferred<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(Ok(value))) => Poll::Ready(Ok(value)),
            Poll::Ready(Ok(Err(error))) => Poll::Ready(Err(BridgeError::Failed(error))),
            Poll::Ready(Err(host_oneshot::Canceled)) => Poll::Ready(Err(BridgeError::Aborted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Serving-side awaitable fed by a forwarding task on the host runtime.
#[must_use = "a pending completion does nothing unless awaited"]
pub struct Pending<T, E> {
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> Future for Pending<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Forwarder dropped without sending: the host runtime went away.
            Poll::Ready(Err(_)) => Poll::Ready(Err(BridgeError::Aborted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

/// Adapter between the host executor `S` and the serving Tokio runtime.
#[derive(Clone)]
pub struct RuntimeBridge<S> {
    host: S,
    serving: Handle,
}

impl<S> fmt::Debug for RuntimeBridge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBridge").finish_non_exhaustive()
    }
}

impl<S: Spawn> RuntimeBridge<S> {
    /// Create a bridge from a host spawner and a handle to the serving runtime.
    pub const fn new(host: S, serving: Handle) -> Self {
        Self { host, serving }
    }

    /// Expose a host completion to the serving runtime.
    ///
    /// The deferred is awaited by a task on the host executor, so it only
    /// settles on the serving side once the host gets around to polling
    /// it. If the host executor has already shut down the returned
    /// [`Pending`] resolves to [`BridgeError::Aborted`].
    pub fn into_serving<T, E>(&self, pending: Deferred<T, E>) -> Pending<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let forward = async move {
            let outcome = pending.await;
            // The serving side may have stopped listening; nothing to do then.
            let _ = tx.send(outcome);
        };
        if let Err(e) = self.host.spawn(forward) {
            warn!(error = %e, "host runtime refused bridged completion");
        }
        Pending { rx }
    }

    /// Run `future` on the serving runtime and expose its result to the host.
    pub fn into_host<F, T, E>(&self, future: F) -> Deferred<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (resolver, deferred) = deferred();
        self.serving.spawn(async move {
            let result = future.await;
            resolver.settle(result);
        });
        deferred
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::executor::{LocalPool, block_on};

    use super::*;

    fn serving_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn host_value_reaches_serving_runtime() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let (resolver, host_pending) = deferred::<u32, String>();
        let awaitable = bridge.into_serving(host_pending);
        assert!(resolver.resolve(7));
        pool.run_until_stalled();

        assert_eq!(runtime.block_on(awaitable), Ok(7));
    }

    #[test]
    fn host_failure_stays_a_failure_in_serving_runtime() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let (resolver, host_pending) = deferred::<u32, String>();
        let awaitable = bridge.into_serving(host_pending);
        resolver.reject(String::from("map unloaded"));
        pool.run_until_stalled();

        assert_eq!(
            runtime.block_on(awaitable),
            Err(BridgeError::Failed(String::from("map unloaded")))
        );
    }

    #[test]
    fn serving_side_waits_until_host_polls() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let (resolver, host_pending) = deferred::<&'static str, String>();
        let awaitable = bridge.into_serving(host_pending);
        let waiter = runtime.spawn(awaitable);

        // Not yet settled: the host has not run its forwarder.
        pool.run_until_stalled();
        assert!(!waiter.is_finished());

        resolver.resolve("done");
        pool.run_until_stalled();
        assert_eq!(runtime.block_on(waiter).unwrap(), Ok("done"));
    }

    #[test]
    fn dropped_resolver_aborts_serving_await() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let (resolver, host_pending) = deferred::<(), String>();
        let awaitable = bridge.into_serving(host_pending);
        drop(resolver);
        pool.run_until_stalled();

        assert_eq!(runtime.block_on(awaitable), Err(BridgeError::Aborted));
    }

    #[test]
    fn bridging_after_host_shutdown_aborts() {
        let runtime = serving_runtime();
        let pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());
        drop(pool);

        let awaitable = bridge.into_serving(Deferred::<(), String>::resolved(()));
        assert_eq!(runtime.block_on(awaitable), Err(BridgeError::Aborted));
    }

    #[test]
    fn serving_value_reaches_host() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let host_pending = bridge.into_host(async {
            tokio::task::yield_now().await;
            Ok::<_, String>(String::from("classicgen"))
        });

        assert_eq!(pool.run_until(host_pending), Ok(String::from("classicgen")));
    }

    #[test]
    fn serving_failure_reaches_host_as_failure() {
        let runtime = serving_runtime();
        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), runtime.handle().clone());

        let host_pending = bridge.into_host(async { Err::<u8, _>(String::from("bind failed")) });

        assert_eq!(
            pool.run_until(host_pending),
            Err(BridgeError::Failed(String::from("bind failed")))
        );
    }

    #[test]
    fn serving_shutdown_aborts_host_await() {
        let runtime = serving_runtime();
        let serving = runtime.handle().clone();
        runtime.shutdown_background();

        let mut pool = LocalPool::new();
        let bridge = RuntimeBridge::new(pool.spawner(), serving);
        let host_pending = bridge.into_host(async { Ok::<u8, String>(1) });

        assert_eq!(pool.run_until(host_pending), Err(BridgeError::Aborted));
    }

    #[test]
    fn presettled_deferreds_are_ready_immediately() {
        assert_eq!(block_on(Deferred::<u8, ()>::resolved(3)), Ok(3));
        assert_eq!(
            block_on(Deferred::<u8, &str>::rejected("nope")),
            Err(BridgeError::Failed("nope"))
        );
    }

    #[test]
    fn resolver_reports_dropped_listener() {
        let (resolver, host_pending) = deferred::<u8, ()>();
        drop(host_pending);
        assert!(resolver.is_canceled());
        assert!(!resolver.resolve(1));
    }
}
