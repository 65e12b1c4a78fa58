//! The shared, cheaply-cloneable handle threaded into every worker (§3.1
//! `ServerContext`), plus the small task-spawning helper that plays the role
//! of a graceful-shutdown-aware executor.

use std::{future::Future, net::IpAddr, sync::Arc};

use tokio_graceful::ShutdownGuard;

use crate::{auth::AuthPolicy, resolver::Resolver, traffic::TrafficCounters};

/// Spawns tasks onto the runtime, gracefully when a [`ShutdownGuard`] is
/// present so in-flight sessions are awaited rather than dropped on
/// shutdown.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    guard: Option<ShutdownGuard>,
}

impl Executor {
    #[must_use]
    pub fn new() -> Self {
        Self { guard: None }
    }

    #[must_use]
    pub fn graceful(guard: ShutdownGuard) -> Self {
        Self { guard: Some(guard) }
    }

    pub fn spawn_task<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future<Output: Send + 'static> + Send + 'static,
    {
        match &self.guard {
            Some(guard) => guard.spawn_task(future),
            None => tokio::spawn(future),
        }
    }

    #[must_use]
    pub fn guard(&self) -> Option<&ShutdownGuard> {
        self.guard.as_ref()
    }
}

/// The per-process handle bundling every piece of shared state a session
/// needs (§3.1). Cloning is cheap: every field is either `Copy`, an `Arc`,
/// or (for the executor) an `Option<ShutdownGuard>` which is itself
/// reference-counted.
#[derive(Clone)]
pub struct ServerContext {
    pub auth: Arc<AuthPolicy>,
    pub traffic: Arc<TrafficCounters>,
    pub resolver: Arc<dyn Resolver>,
    /// Local address new outbound sockets (CONNECT dials, UDP flow sockets)
    /// are bound to before connecting. `None` lets the OS pick.
    pub bind_addr: Option<IpAddr>,
    pub executor: Executor,
}

impl ServerContext {
    #[must_use]
    pub fn new(
        auth: AuthPolicy,
        traffic: TrafficCounters,
        resolver: impl Resolver,
        bind_addr: Option<IpAddr>,
        executor: Executor,
    ) -> Self {
        Self {
            auth: Arc::new(auth),
            traffic: Arc::new(traffic),
            resolver: Arc::new(resolver),
            bind_addr,
            executor,
        }
    }
}
