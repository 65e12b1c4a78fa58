//! The acceptor/worker pool (§4.6): bind a listener, spawn one task per
//! accepted client, reap finished tasks, back off on transient accept
//! failure.

use std::{net::SocketAddr, time::Duration};

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{acceptor::Socks5Acceptor, context::ServerContext};

/// `accept()`-failure backoff, mirroring the spec's "sleep ~64us" note so a
/// resource-exhausted acceptor doesn't busy-spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_micros(64);

pub struct Server {
    listener: TcpListener,
    acceptor: Socks5Acceptor,
}

impl Server {
    pub async fn bind(addr: SocketAddr, ctx: ServerContext) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            acceptor: Socks5Acceptor::new(ctx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the context's shutdown guard is cancelled
    /// (or forever, if none was configured). Every accepted socket is
    /// handed to `ServerContext::executor`, whose `JoinSet`-free tracking
    /// (via `tokio-graceful`) plays the role of the spec's worker reaper:
    /// in-flight sessions are awaited on shutdown rather than dropped.
    pub async fn serve(self) {
        let Self { listener, acceptor } = self;
        let executor = acceptor_executor(&acceptor);
        let mut local_tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                () = cancelled(&executor) => {
                    info!("acceptor: shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            debug!(%peer_addr, "accepted connection");
                            let acceptor = acceptor.clone();
                            let task = async move { acceptor.accept(stream, peer_addr).await };
                            if executor.guard().is_some() {
                                executor.spawn_task(task);
                            } else {
                                local_tasks.spawn(task);
                            }
                        }
                        Err(err) => {
                            error!(%err, "accept failed, backing off");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                Some(result) = local_tasks.join_next(), if !local_tasks.is_empty() => {
                    if let Err(err) = result {
                        warn!(%err, "session task panicked");
                    }
                }
            }
        }

        while local_tasks.join_next().await.is_some() {}
    }
}

fn acceptor_executor(acceptor: &Socks5Acceptor) -> crate::context::Executor {
    acceptor.context().executor.clone()
}

async fn cancelled(executor: &crate::context::Executor) {
    match executor.guard() {
        Some(guard) => guard.clone().cancelled().await,
        None => std::future::pending().await,
    }
}
