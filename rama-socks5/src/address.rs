//! The SOCKS5 address value type (§3 `Address`, §4.1 `parseAddress`/`encodeReply`).

use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use bytes::{BufMut, Bytes, BytesMut};
use byteorder::{BigEndian, ByteOrder};

use crate::error::SocksError;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// The maximum length of a domain name carried in a SOCKS5 address, per
/// RFC 1928 (the length is encoded in a single byte).
pub const MAX_DOMAIN_LEN: usize = 255;

/// A SOCKS5 wire address: an IPv4 address, an IPv6 address, or a domain
/// name, each with a 16-bit port.
///
/// Domain name bytes are carried as opaque bytes, not validated as UTF-8 or
/// as a well-formed hostname at parse time — the wire format only bounds
/// their length, and validation (if any) belongs to whoever resolves them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Ipv4(Ipv4Addr, u16),
    Ipv6(Ipv6Addr, u16),
    Domain(Bytes, u16),
}

impl Address {
    /// The port carried by this address.
    #[must_use]
    pub fn port(&self) -> u16 {
        match self {
            Self::Ipv4(_, port) | Self::Ipv6(_, port) | Self::Domain(_, port) => *port,
        }
    }

    /// `true` if this address is the IPv4 or IPv6 wildcard (`0.0.0.0` or
    /// `::`), used by UDP ASSOCIATE (§4.5.2) to request an OS-chosen port.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Ipv4(ip, _) => ip.is_unspecified(),
            Self::Ipv6(ip, _) => ip.is_unspecified(),
            Self::Domain(_, _) => false,
        }
    }

    /// Parse a wire address: `[atyp, addr.., port_hi, port_lo]`.
    ///
    /// Returns the parsed [`Address`] and the number of bytes consumed.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), SocksError> {
        let atyp = *bytes
            .first()
            .ok_or_else(|| SocksError::truncated("address type"))?;
        let rest = &bytes[1..];
        match atyp {
            ATYP_IPV4 => {
                if rest.len() < 4 + 2 {
                    return Err(SocksError::truncated("ipv4 address"));
                }
                let ip = Ipv4Addr::new(rest[0], rest[1], rest[2], rest[3]);
                let port = BigEndian::read_u16(&rest[4..6]);
                Ok((Self::Ipv4(ip, port), 1 + 4 + 2))
            }
            ATYP_IPV6 => {
                if rest.len() < 16 + 2 {
                    return Err(SocksError::truncated("ipv6 address"));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&rest[..16]);
                let ip = Ipv6Addr::from(octets);
                let port = BigEndian::read_u16(&rest[16..18]);
                Ok((Self::Ipv6(ip, port), 1 + 16 + 2))
            }
            ATYP_DOMAIN => {
                let len = *rest.first().ok_or_else(|| SocksError::truncated("domain length"))? as usize;
                let rest = &rest[1..];
                if rest.len() < len + 2 {
                    return Err(SocksError::truncated("domain name"));
                }
                let name = Bytes::copy_from_slice(&rest[..len]);
                let port = BigEndian::read_u16(&rest[len..len + 2]);
                Ok((Self::Domain(name, port), 1 + 1 + len + 2))
            }
            other => Err(SocksError::unsupported_address_type(other)),
        }
    }

    /// Encode this address onto `buf` as `[atyp, addr.., port_hi, port_lo]`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Ipv4(ip, port) => {
                buf.put_u8(ATYP_IPV4);
                buf.put_slice(&ip.octets());
                buf.put_u16(*port);
            }
            Self::Ipv6(ip, port) => {
                buf.put_u8(ATYP_IPV6);
                buf.put_slice(&ip.octets());
                buf.put_u16(*port);
            }
            Self::Domain(name, port) => {
                buf.put_u8(ATYP_DOMAIN);
                buf.put_u8(name.len() as u8);
                buf.put_slice(name);
                buf.put_u16(*port);
            }
        }
    }

    /// Encode the zero IPv4 address/port, used for error replies that have
    /// no meaningful bound address to report (§4.1 `encodeReply`).
    pub fn encode_zero(buf: &mut BytesMut) {
        buf.put_u8(ATYP_IPV4);
        buf.put_slice(&[0, 0, 0, 0]);
        buf.put_u16(0);
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(addr) => Self::Ipv4(*addr.ip(), addr.port()),
            SocketAddr::V6(addr) => Self::Ipv6(*addr.ip(), addr.port()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(ip, port) => write!(f, "{ip}:{port}"),
            Self::Ipv6(ip, port) => write!(f, "[{ip}]:{port}"),
            Self::Domain(name, port) => {
                write!(f, "{}:{port}", String::from_utf8_lossy(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_ipv4() {
        let addr = Address::Ipv4(Ipv4Addr::new(127, 0, 0, 1), 80);
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        let (parsed, consumed) = Address::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, addr);
    }

    #[test]
    fn round_trip_ipv6() {
        let addr = Address::Ipv6(Ipv6Addr::LOCALHOST, 443);
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        let (parsed, consumed) = Address::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, addr);
    }

    #[test]
    fn round_trip_domain() {
        let addr = Address::Domain(Bytes::from_static(b"example.com"), 8080);
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        let (parsed, consumed) = Address::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, addr);
    }

    #[test]
    fn domain_length_is_bounded_by_wire_length_byte() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x03);
        buf.put_u8(255);
        buf.put_slice(&[b'a'; 255]);
        buf.put_u16(1);
        let (parsed, consumed) = Address::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        match parsed {
            Address::Domain(name, port) => {
                assert_eq!(name.len(), 255);
                assert_eq!(port, 1);
            }
            _ => panic!("expected domain"),
        }
    }

    #[test]
    fn unknown_atyp_is_rejected() {
        let err = Address::parse(&[0x7f, 0, 0]).unwrap_err();
        assert_eq!(err.reply_code().as_u8(), 0x08);
    }

    #[test]
    fn truncated_input_is_general_failure() {
        let err = Address::parse(&[0x01, 1, 2, 3]).unwrap_err();
        assert_eq!(err.reply_code().as_u8(), 0x01);
    }

    #[test]
    fn wildcard_detection() {
        assert!(Address::Ipv4(Ipv4Addr::UNSPECIFIED, 0).is_wildcard());
        assert!(Address::Ipv6(Ipv6Addr::UNSPECIFIED, 0).is_wildcard());
        assert!(!Address::Ipv4(Ipv4Addr::LOCALHOST, 0).is_wildcard());
    }
}
