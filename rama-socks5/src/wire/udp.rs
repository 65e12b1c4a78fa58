//! `parseUdpDatagram`/`encodeUdpDatagram` — RFC 1928 §7 UDP request header
//! framing, used by the UDP relay (§4.4).

use bytes::{BufMut, Bytes, BytesMut};

use crate::{address::Address, error::SocksError};

/// Parse `[0x00, 0x00, FRAG, atyp, addr.., port, payload..]`.
///
/// `FRAG` must be `0`; fragmentation is not supported (§9 open question b:
/// this implementation terminates the associate on a nonzero FRAG, matching
/// the behavior of the original source rather than silently dropping it).
pub fn parse_udp_datagram(bytes: &[u8]) -> Result<(Address, Bytes), SocksError> {
    if bytes.len() < 4 {
        return Err(SocksError::truncated("udp header"));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(SocksError::reserved_byte_not_zero());
    }
    let frag = bytes[2];
    if frag != 0x00 {
        return Err(SocksError::fragmented_datagram());
    }
    let (addr, consumed) = Address::parse(&bytes[3..])?;
    let payload = Bytes::copy_from_slice(&bytes[3 + consumed..]);
    Ok((addr, payload))
}

/// Encode `[0x00, 0x00, 0x00, atyp, addr.., port, payload..]`.
#[must_use]
pub fn encode_udp_datagram(src_addr: &Address, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(3 + 22 + payload.len());
    buf.put_u8(0x00);
    buf.put_u8(0x00);
    buf.put_u8(0x00);
    src_addr.encode(&mut buf);
    buf.put_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trips_payload() {
        let addr = Address::Ipv4(Ipv4Addr::new(8, 8, 8, 8), 53);
        let encoded = encode_udp_datagram(&addr, b"hello");
        let (parsed_addr, payload) = parse_udp_datagram(&encoded).unwrap();
        assert_eq!(parsed_addr, addr);
        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn rejects_nonzero_frag() {
        let wire = [0x00, 0x00, 0x01, 0x01, 1, 2, 3, 4, 0, 80];
        let err = parse_udp_datagram(&wire).unwrap_err();
        assert_eq!(err.reply_code().as_u8(), 0x01);
    }

    #[test]
    fn rejects_nonzero_reserved_bytes() {
        let wire = [0x01, 0x00, 0x00, 0x01, 1, 2, 3, 4, 0, 80];
        assert!(parse_udp_datagram(&wire).is_err());
    }

    #[test]
    fn empty_payload_is_allowed() {
        let addr = Address::Ipv4(Ipv4Addr::LOCALHOST, 1);
        let encoded = encode_udp_datagram(&addr, b"");
        let (_, payload) = parse_udp_datagram(&encoded).unwrap();
        assert!(payload.is_empty());
    }
}
