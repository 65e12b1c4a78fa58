//! The `Service`-shaped entry point for one accepted connection (§4.6).
//!
//! Grounded on the donor crate family's own `Socks5Acceptor` usage pattern
//! (`Socks5Acceptor::default().with_authorizer(...)`), but collapsed to a
//! thin wrapper over [`ServerContext`] since every piece of configuration
//! this implementation needs already lives there.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::{context::ServerContext, session};

/// Drives one accepted TCP connection through the SOCKS5 session state
/// machine. Cheap to clone: it only holds a [`ServerContext`].
#[derive(Clone)]
pub struct Socks5Acceptor {
    ctx: ServerContext,
}

impl Socks5Acceptor {
    #[must_use]
    pub fn new(ctx: ServerContext) -> Self {
        Self { ctx }
    }

    /// Serve one accepted connection to completion.
    pub async fn accept(&self, stream: TcpStream, peer_addr: SocketAddr) {
        session::run_session(stream, peer_addr, self.ctx.clone()).await;
    }

    #[must_use]
    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }
}
