//! `parseRequest` — the client's post-authentication request frame (§4.1).

use crate::{address::Address, error::SocksError};

const SOCKS_VERSION: u8 = 0x05;

const CMD_CONNECT: u8 = 0x01;
const CMD_UDP_ASSOCIATE: u8 = 0x03;

/// The command requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    UdpAssociate,
}

/// Parse `[0x05, cmd, 0x00, ..address]`.
pub fn parse_request(bytes: &[u8]) -> Result<(Command, Address), SocksError> {
    if bytes.len() < 3 {
        return Err(SocksError::truncated("request header"));
    }
    let version = bytes[0];
    if version != SOCKS_VERSION {
        return Err(SocksError::unsupported_version(version));
    }
    let cmd = bytes[1];
    let reserved = bytes[2];
    if reserved != 0x00 {
        return Err(SocksError::reserved_byte_not_zero());
    }
    let command = match cmd {
        CMD_CONNECT => Command::Connect,
        CMD_UDP_ASSOCIATE => Command::UdpAssociate,
        other => return Err(SocksError::unsupported_command(other)),
    };
    let (addr, _consumed) = Address::parse(&bytes[3..])?;
    Ok((command, addr))
}
