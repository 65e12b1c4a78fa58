//! The per-client state machine (§4.5): greeting, authentication, request,
//! then handing off to the CONNECT or UDP_ASSOCIATE relay.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

use crate::{
    address::Address,
    context::ServerContext,
    error::{ReplyCode, SocksError},
    relay,
    resolver::TransportKind,
    wire::{
        Command, STATUS_FAILURE, STATUS_SUCCESS, encode_auth_response, encode_method_reply,
        encode_reply, parse_credentials, parse_greeting, parse_request,
    },
};

/// Drive one accepted connection from greeting through teardown. Every
/// fallible step maps its error to a reply code and a single reply frame,
/// per §7's policy ("one SOCKS error reply followed by connection
/// teardown").
pub async fn run_session(mut stream: TcpStream, peer_addr: SocketAddr, ctx: ServerContext) {
    match drive(&mut stream, peer_addr, &ctx).await {
        Ok(()) => debug!(%peer_addr, "session ended"),
        Err(err) => warn!(%peer_addr, %err, "session ended with error"),
    }
}

async fn drive(
    stream: &mut TcpStream,
    peer_addr: SocketAddr,
    ctx: &ServerContext,
) -> Result<(), SocksError> {
    let offered = read_greeting(stream).await?;

    let selected = ctx.auth.select_method(&offered, peer_addr.ip());
    let wire_method = match selected {
        crate::auth::SelectedMethod::NoAuth => 0x00,
        crate::auth::SelectedMethod::UsernamePassword => 0x02,
        crate::auth::SelectedMethod::Invalid => 0xFF,
    };
    stream.write_all(&encode_method_reply(wire_method)).await?;

    match selected {
        crate::auth::SelectedMethod::Invalid => {
            return Ok(());
        }
        crate::auth::SelectedMethod::UsernamePassword => {
            let creds = read_credentials(stream).await?;
            match ctx.auth.verify_credentials(&creds.user, &creds.pass) {
                Ok(()) => {
                    stream
                        .write_all(&encode_auth_response(0x01, STATUS_SUCCESS))
                        .await?;
                    ctx.auth.remember_client(peer_addr.ip());
                }
                Err(err) => {
                    stream
                        .write_all(&encode_auth_response(0x01, STATUS_FAILURE))
                        .await?;
                    return Err(err);
                }
            }
        }
        crate::auth::SelectedMethod::NoAuth => {}
    }

    let (command, target) = match read_request(stream).await {
        Ok(parsed) => parsed,
        Err(err) => {
            stream
                .write_all(&encode_reply(err.reply_code(), None))
                .await?;
            return Err(err);
        }
    };

    match command {
        Command::Connect => handle_connect(stream, &target, ctx).await,
        Command::UdpAssociate => handle_udp_associate(stream, peer_addr, &target, ctx).await,
    }
}

async fn read_greeting(stream: &mut TcpStream) -> Result<Vec<u8>, SocksError> {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;
    let nmethods = header[1] as usize;
    let mut buf = vec![0u8; 2 + nmethods];
    buf[..2].copy_from_slice(&header);
    stream.read_exact(&mut buf[2..]).await?;
    parse_greeting(&buf)
}

async fn read_credentials(
    stream: &mut TcpStream,
) -> Result<crate::wire::Credentials, SocksError> {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await?;
    let ulen = head[1] as usize;
    let mut rest = vec![0u8; ulen + 1];
    stream.read_exact(&mut rest).await?;
    let plen = rest[ulen] as usize;
    let mut pass = vec![0u8; plen];
    stream.read_exact(&mut pass).await?;

    let mut buf = Vec::with_capacity(2 + ulen + 1 + plen);
    buf.extend_from_slice(&head);
    buf.extend_from_slice(&rest);
    buf.extend_from_slice(&pass);
    parse_credentials(&buf)
}

async fn read_request(stream: &mut TcpStream) -> Result<(Command, Address), SocksError> {
    const ATYP_IPV4: u8 = 0x01;
    const ATYP_DOMAIN: u8 = 0x03;
    const ATYP_IPV6: u8 = 0x04;

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let mut buf = Vec::from(header.as_slice());
    match header[3] {
        ATYP_IPV4 => {
            let mut rest = [0u8; 6];
            stream.read_exact(&mut rest).await?;
            buf.extend_from_slice(&rest);
        }
        ATYP_IPV6 => {
            let mut rest = [0u8; 18];
            stream.read_exact(&mut rest).await?;
            buf.extend_from_slice(&rest);
        }
        ATYP_DOMAIN => {
            let len = stream.read_u8().await?;
            buf.push(len);
            let mut rest = vec![0u8; len as usize + 2];
            stream.read_exact(&mut rest).await?;
            buf.extend_from_slice(&rest);
        }
        _ => {
            // unknown atyp: parse_request will reject it below via
            // Address::parse without needing the rest of the frame.
        }
    }
    parse_request(&buf)
}

async fn handle_connect(
    stream: &mut TcpStream,
    target: &Address,
    ctx: &ServerContext,
) -> Result<(), SocksError> {
    let resolved = ctx
        .resolver
        .resolve(target, TransportKind::Tcp)
        .await
        .map_err(|err| {
            SocksError::from(std::io::Error::other(format!("resolve failed: {err}")))
        })?;

    let target_stream = match dial(resolved, ctx).await {
        Ok(stream) => stream,
        Err(err) => {
            let code = ReplyCode::from_io_error(&err);
            let reply_err = SocksError::from(err);
            let _ = stream.write_all(&encode_reply(code, None)).await;
            return Err(reply_err);
        }
    };

    let bound_addr: Address = target_stream.local_addr()?.into();
    stream
        .write_all(&encode_reply(ReplyCode::Success, Some(&bound_addr)))
        .await?;

    info!(%target, "connect: relaying");
    relay::copy_bidirectional(stream, target_stream, ctx.traffic.clone())
        .await
        .map_err(SocksError::from)
}

async fn dial(target: SocketAddr, ctx: &ServerContext) -> std::io::Result<TcpStream> {
    let socket = match target {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Some(bind_ip) = ctx.bind_addr {
        socket.bind(SocketAddr::new(bind_ip, 0))?;
    }
    socket.connect(target).await
}

async fn handle_udp_associate(
    tcp: &mut TcpStream,
    peer_addr: SocketAddr,
    declared: &Address,
    ctx: &ServerContext,
) -> Result<(), SocksError> {
    let family_v6 = match declared {
        Address::Ipv6(..) => true,
        Address::Ipv4(..) => false,
        Address::Domain(..) => peer_addr.is_ipv6(),
    };
    let local = match ctx.bind_addr {
        Some(ip) => SocketAddr::new(ip, 0),
        None if family_v6 => SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), 0),
        None => SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), 0),
    };
    let client_socket = UdpSocket::bind(local).await?;

    let pinned_client = if declared.is_wildcard() {
        None
    } else {
        let resolved = ctx
            .resolver
            .resolve(declared, TransportKind::Udp)
            .await
            .map_err(|err| {
                SocksError::from(std::io::Error::other(format!("resolve failed: {err}")))
            })?;
        client_socket.connect(resolved).await?;
        Some(resolved)
    };

    let bound_addr: Address = client_socket.local_addr()?.into();
    tcp.write_all(&encode_reply(ReplyCode::Success, Some(&bound_addr)))
        .await?;

    info!(%peer_addr, "udp associate: relaying");
    relay::copy_loop_udp(
        tcp,
        client_socket,
        pinned_client,
        ctx.resolver.clone(),
        ctx.bind_addr,
        ctx.traffic.clone(),
    )
    .await
    .map_err(SocksError::from)
}
