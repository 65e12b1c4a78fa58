//! Name resolution for the `Address` the client asked us to reach (§4.3,
//! §4.4): literal IPv4/IPv6 addresses resolve locally, domain names go
//! through a [`Resolver`].
//!
//! The trait is hand-rolled rather than reused from `rama-dns` directly:
//! a SOCKS5 relay only ever needs "turn this address into a socket address
//! to dial or bind", not the full `ipv4_lookup`/`ipv6_lookup`/`txt_lookup`
//! surface. The object-safety boxing below mirrors the `DynDnsResolver`
//! pattern in `rama-dns`'s own `boxed.rs`.

use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
};

use rama_dns::{BoxDnsResolver, DnsResolver};
use rama_error::{BoxError, ErrorContext};
use rama_net::address::Domain;

use crate::address::Address;

/// Whether the resolved address is for an outbound TCP dial (CONNECT) or
/// the peer a UDP datagram should be sent to. Both resolve the same way
/// today; the distinction exists so a future resolver could special-case
/// one (e.g. a split-horizon resolver for UDP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
}

/// Resolves a client-supplied [`Address`] to a concrete [`SocketAddr`].
///
/// Implementations must be cheap to clone (an `Arc` internally, typically)
/// since a [`ServerContext`](crate::context::ServerContext) hands out one
/// per accepted connection.
pub trait Resolver: Send + Sync + 'static {
    fn resolve<'a>(
        &'a self,
        addr: &'a Address,
        kind: TransportKind,
    ) -> Pin<Box<dyn Future<Output = Result<SocketAddr, BoxError>> + Send + 'a>>;
}

/// The default [`Resolver`]: literal IPs pass through untouched, domain
/// names go through `rama-dns`'s global resolver, preferring an A record
/// and falling back to AAAA.
#[derive(Debug, Clone)]
pub struct DnsBackedResolver {
    inner: BoxDnsResolver,
}

impl Default for DnsBackedResolver {
    fn default() -> Self {
        Self {
            inner: rama_dns::global_dns_resolver(),
        }
    }
}

impl DnsBackedResolver {
    #[must_use]
    pub fn new(inner: BoxDnsResolver) -> Self {
        Self { inner }
    }
}

impl Resolver for DnsBackedResolver {
    fn resolve<'a>(
        &'a self,
        addr: &'a Address,
        _kind: TransportKind,
    ) -> Pin<Box<dyn Future<Output = Result<SocketAddr, BoxError>> + Send + 'a>> {
        Box::pin(async move {
            match addr {
                Address::Ipv4(ip, port) => Ok(SocketAddr::new(IpAddr::V4(*ip), *port)),
                Address::Ipv6(ip, port) => Ok(SocketAddr::new(IpAddr::V6(*ip), *port)),
                Address::Domain(name, port) => {
                    let domain = Domain::try_from(name.as_ref())
                        .context("parse domain name for resolution")?;
                    match self.inner.ipv4_lookup(domain.clone()).await {
                        Ok(ips) if !ips.is_empty() => {
                            Ok(SocketAddr::new(IpAddr::V4(ips[0]), *port))
                        }
                        _ => {
                            let ips = self
                                .inner
                                .ipv6_lookup(domain)
                                .await
                                .context("resolve domain name")?;
                            let ip = ips
                                .first()
                                .ok_or_else(|| -> BoxError { "no addresses found".into() })?;
                            Ok(SocketAddr::new(IpAddr::V6(*ip), *port))
                        }
                    }
                }
            }
        })
    }
}
