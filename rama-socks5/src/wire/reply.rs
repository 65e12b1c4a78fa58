//! `encodeReply` — the server's reply to a CONNECT/UDP_ASSOCIATE request
//! (§4.1).

use bytes::{BufMut, BytesMut};

use crate::{address::Address, error::ReplyCode};

const SOCKS_VERSION: u8 = 0x05;

/// Encode `[0x05, code, 0x00, atyp, addr.., port]`.
///
/// `bound_addr` is the local address to report back (the socket the server
/// bound for the relay). Error replies that have no meaningful bound
/// address pass `None`, which is encoded as the IPv4 zero address.
#[must_use]
pub fn encode_reply(code: ReplyCode, bound_addr: Option<&Address>) -> BytesMut {
    let mut buf = BytesMut::with_capacity(22);
    buf.put_u8(SOCKS_VERSION);
    buf.put_u8(code.as_u8());
    buf.put_u8(0x00);
    match bound_addr {
        Some(addr) => addr.encode(&mut buf),
        None => Address::encode_zero(&mut buf),
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn success_reply_with_ipv4_bound_addr_is_ten_bytes() {
        let addr = Address::Ipv4(Ipv4Addr::new(127, 0, 0, 1), 1080);
        let buf = encode_reply(ReplyCode::Success, Some(&addr));
        assert_eq!(buf.len(), 10);
        assert_eq!(&buf[..3], &[0x05, 0x00, 0x00]);
    }

    #[test]
    fn ipv6_bound_addr_is_twentytwo_bytes() {
        let addr = Address::Ipv6(std::net::Ipv6Addr::LOCALHOST, 1080);
        let buf = encode_reply(ReplyCode::Success, Some(&addr));
        assert_eq!(buf.len(), 22);
    }

    #[test]
    fn error_reply_without_bound_addr_uses_ipv4_zeros() {
        let buf = encode_reply(ReplyCode::GeneralFailure, None);
        assert_eq!(buf.len(), 10);
        assert_eq!(&buf[3..], &[0x01, 0, 0, 0, 0, 0, 0]);
    }
}
