//! The UDP-associate relay (§4.4): per-flow target socket table, datagram
//! framing/deframing, and the multiplexed event loop driving it.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::io::AsyncReadExt as _;
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, warn};

use crate::{
    address::Address,
    resolver::{Resolver, TransportKind},
    traffic::TrafficCounters,
    wire::{encode_udp_datagram, parse_udp_datagram},
};

const MAX_DATAGRAM: usize = 64 * 1024;

/// A (target address, target socket) table (§3 `UdpFlowTable`). Lookup is a
/// linear scan, which the design notes call out as acceptable: a single
/// UDP-associate session typically talks to a handful of distinct targets.
#[derive(Default)]
pub struct UdpFlowTable {
    flows: Vec<(Address, Arc<UdpSocket>)>,
}

impl UdpFlowTable {
    #[must_use]
    pub fn new() -> Self {
        Self { flows: Vec::new() }
    }

    #[must_use]
    pub fn get(&self, addr: &Address) -> Option<Arc<UdpSocket>> {
        self.flows
            .iter()
            .find(|(a, _)| a == addr)
            .map(|(_, s)| s.clone())
    }

    pub fn insert(&mut self, addr: Address, socket: Arc<UdpSocket>) {
        self.flows.push((addr, socket));
    }

    /// Drop the flow for `addr`, if any. Used when its socket can no longer
    /// be polled for replies (§4.4: a flow socket that errors out of the
    /// polling set must not be left reachable via `get`, or sends to it
    /// would silently go dark for the rest of the session).
    pub fn remove(&mut self, addr: &Address) {
        self.flows.retain(|(a, _)| a != addr);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

type FlowRecv = (Address, Arc<UdpSocket>, io::Result<Vec<u8>>);

fn recv_from_flow(
    addr: Address,
    socket: Arc<UdpSocket>,
) -> std::pin::Pin<Box<dyn Future<Output = FlowRecv> + Send>> {
    Box::pin(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let result = socket.recv(&mut buf).await.map(|n| {
            buf.truncate(n);
            buf
        });
        (addr, socket, result)
    })
}

/// Drive one UDP-associate session until the control TCP socket closes or
/// errors (§4.4). `client_socket` is the server-side socket the client sends
/// framed datagrams to; if `pinned_client` is already known (the client
/// declared a concrete, non-wildcard source address at ASSOCIATE time) no
/// further datagram is accepted from anywhere else, otherwise the first
/// datagram received pins it.
pub async fn copy_loop_udp(
    tcp: &mut TcpStream,
    client_socket: UdpSocket,
    mut pinned_client: Option<SocketAddr>,
    resolver: Arc<dyn Resolver>,
    bind_addr: Option<std::net::IpAddr>,
    traffic: Arc<TrafficCounters>,
) -> io::Result<()> {
    let mut flows = UdpFlowTable::new();
    let mut pending: FuturesUnordered<std::pin::Pin<Box<dyn Future<Output = FlowRecv> + Send>>> =
        FuturesUnordered::new();
    let mut discard = [0u8; 256];
    let mut client_buf = [0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            result = tcp.read(&mut discard) => {
                match result {
                    Ok(0) | Err(_) => {
                        debug!("udp associate: control connection closed, tearing down");
                        return Ok(());
                    }
                    Ok(_) => {
                        // payload on the control channel is not part of the protocol;
                        // discarded per the open-question resolution in the design notes.
                    }
                }
            }

            result = client_socket.recv_from(&mut client_buf) => {
                let (n, from) = result?;
                match pinned_client {
                    Some(pinned) if pinned != from => {
                        debug!(%from, "udp associate: dropping datagram from unpinned peer");
                        continue;
                    }
                    None => {
                        debug!(%from, "udp associate: pinning client source address");
                        pinned_client = Some(from);
                    }
                    _ => {}
                }

                let (target, payload) = match parse_udp_datagram(&client_buf[..n]) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        warn!(%err, "udp associate: malformed datagram, tearing down");
                        return Ok(());
                    }
                };

                let socket = match flows.get(&target) {
                    Some(socket) => socket,
                    None => {
                        match new_flow_socket(&target, &resolver, bind_addr).await {
                            Ok(socket) => {
                                let socket = Arc::new(socket);
                                flows.insert(target.clone(), socket.clone());
                                pending.push(recv_from_flow(target.clone(), socket.clone()));
                                socket
                            }
                            Err(err) => {
                                // a resolve/bind/connect failure for one target must not
                                // tear down flows that are already relaying for this
                                // associate; drop this datagram and keep the session alive.
                                warn!(%err, %target, "udp associate: failed to set up flow, dropping datagram");
                                continue;
                            }
                        }
                    }
                };

                traffic.add_upload(payload.len() as u64);
                if let Err(err) = socket.send(&payload).await {
                    warn!(%err, %target, "udp associate: failed to send on flow, dropping flow");
                    flows.remove(&target);
                }
            }

            Some((addr, socket, result)) = pending.next(), if !pending.is_empty() => {
                match result {
                    Ok(payload) => {
                        traffic.add_download(payload.len() as u64);
                        let reply = encode_udp_datagram(&addr, &payload);
                        if let Some(pinned) = pinned_client {
                            client_socket.send_to(&reply, pinned).await?;
                        }
                        pending.push(recv_from_flow(addr, socket));
                    }
                    Err(err) => {
                        warn!(%err, %addr, "udp associate: flow socket errored, dropping flow");
                        flows.remove(&addr);
                    }
                }
            }
        }
    }
}

async fn new_flow_socket(
    target: &Address,
    resolver: &Arc<dyn Resolver>,
    bind_addr: Option<std::net::IpAddr>,
) -> io::Result<UdpSocket> {
    let resolved = resolver
        .resolve(target, TransportKind::Udp)
        .await
        .map_err(io::Error::other)?;
    bind_and_connect(bind_addr, resolved).await
}

async fn bind_and_connect(
    bind_addr: Option<std::net::IpAddr>,
    target: SocketAddr,
) -> io::Result<UdpSocket> {
    let local = match bind_addr {
        Some(ip) => SocketAddr::new(ip, 0),
        None => match target {
            SocketAddr::V4(_) => SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::V6(_) => SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), 0),
        },
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(target).await?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_addr(port: u16) -> Address {
        Address::Ipv4(std::net::Ipv4Addr::LOCALHOST, port)
    }

    async fn bound_socket() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    #[tokio::test]
    async fn distinct_addresses_get_distinct_sockets() {
        let mut table = UdpFlowTable::new();
        let a = loopback_addr(1);
        let b = loopback_addr(2);
        let socket_a = bound_socket().await;
        let socket_b = bound_socket().await;

        table.insert(a.clone(), socket_a.clone());
        table.insert(b.clone(), socket_b.clone());

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(&a).unwrap().local_addr().unwrap(),
            socket_a.local_addr().unwrap()
        );
        assert_eq!(
            table.get(&b).unwrap().local_addr().unwrap(),
            socket_b.local_addr().unwrap()
        );
    }

    #[tokio::test]
    async fn lookup_for_unknown_address_is_none() {
        let table = UdpFlowTable::new();
        assert!(table.get(&loopback_addr(1)).is_none());
    }

    #[tokio::test]
    async fn remove_drops_the_flow_so_the_next_lookup_misses() {
        let mut table = UdpFlowTable::new();
        let addr = loopback_addr(1);
        table.insert(addr.clone(), bound_socket().await);
        assert!(table.get(&addr).is_some());

        table.remove(&addr);

        assert!(table.get(&addr).is_none());
        assert!(table.is_empty());
    }
}
