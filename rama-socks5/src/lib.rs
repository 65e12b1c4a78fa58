//! A SOCKS5 proxy protocol engine (RFC 1928) with RFC 1929
//! username/password sub-negotiation: wire codec, auth policy, the TCP and
//! UDP-associate relays, the per-client session state machine, and the
//! acceptor/worker pool that ties them together.
//!
//! [`Socks5Acceptor`] is the entry point for embedding this engine behind
//! an already-bound listener; [`Server`] additionally owns the listener and
//! the accept loop for a standalone deployment.

pub mod acceptor;
pub mod address;
pub mod auth;
pub mod context;
pub mod error;
pub mod relay;
pub mod resolver;
pub mod server;
pub mod session;
pub mod traffic;
pub mod wire;

pub use acceptor::Socks5Acceptor;
pub use address::Address;
pub use auth::AuthPolicy;
pub use context::{Executor, ServerContext};
pub use error::{ReplyCode, SocksError};
pub use resolver::{DnsBackedResolver, Resolver, TransportKind};
pub use server::Server;
pub use traffic::{TrafficCounters, TrafficObserver};
