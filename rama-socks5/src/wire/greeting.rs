//! `parseGreeting` — the client's initial method-negotiation message (§4.1).

use crate::error::SocksError;

const SOCKS_VERSION: u8 = 0x05;

/// The "no authentication required" method id (RFC 1928 §3).
pub const METHOD_NO_AUTH: u8 = 0x00;
/// The "username/password" method id (RFC 1929).
pub const METHOD_USERNAME_PASSWORD: u8 = 0x02;
/// The sentinel "no acceptable methods" reply value (RFC 1928 §3).
pub const METHOD_INVALID: u8 = 0xFF;

/// Parse a client greeting: `[0x05, nmethods, methods[nmethods]]`.
///
/// Returns the list of offered method ids in the order the client sent
/// them.
pub fn parse_greeting(bytes: &[u8]) -> Result<Vec<u8>, SocksError> {
    if bytes.len() < 2 {
        return Err(SocksError::truncated("greeting header"));
    }
    let version = bytes[0];
    if version != SOCKS_VERSION {
        return Err(SocksError::unsupported_version(version));
    }
    let nmethods = bytes[1] as usize;
    let methods = bytes
        .get(2..2 + nmethods)
        .ok_or_else(|| SocksError::truncated("greeting methods"))?;
    Ok(methods.to_vec())
}

/// Encode the server's method-selection reply: `[0x05, method]`, or
/// `[0x05, 0xFF]` if no acceptable method was found.
#[must_use]
pub fn encode_method_reply(method: u8) -> [u8; 2] {
    [SOCKS_VERSION, method]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_no_auth_offer() {
        let methods = parse_greeting(&[0x05, 0x01, 0x00]).unwrap();
        assert_eq!(methods, vec![0x00]);
    }

    #[test]
    fn parses_multiple_offers() {
        let methods = parse_greeting(&[0x05, 0x02, 0x00, 0x02]).unwrap();
        assert_eq!(methods, vec![0x00, 0x02]);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse_greeting(&[0x04, 0x01, 0x00]).unwrap_err();
        assert_eq!(err.reply_code().as_u8(), 0x01);
    }

    #[test]
    fn rejects_short_input() {
        assert!(parse_greeting(&[0x05, 0x02, 0x00]).is_err());
        assert!(parse_greeting(&[0x05]).is_err());
    }

    #[test]
    fn encodes_reply() {
        assert_eq!(encode_method_reply(METHOD_NO_AUTH), [0x05, 0x00]);
        assert_eq!(encode_method_reply(METHOD_INVALID), [0x05, 0xFF]);
    }
}
