//! `parseCredentials`/`encodeAuthResponse` — RFC 1929 username/password
//! sub-negotiation (§4.1).

use bytes::Bytes;

use crate::error::SocksError;

const USERPASS_VERSION: u8 = 0x01;

/// `Success` / `NotAllowed` status byte for the credential reply.
pub const STATUS_SUCCESS: u8 = 0x00;
pub const STATUS_FAILURE: u8 = 0x01;

/// Parsed username/password sub-negotiation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: Bytes,
    pub pass: Bytes,
}

/// Parse `[0x01, ulen, user[ulen], plen, pass[plen]]`.
///
/// User and password are treated as opaque byte strings — comparison must
/// be byte-exact, not C-string (NUL-terminated) semantics, since the wire
/// format allows embedded NUL bytes.
pub fn parse_credentials(bytes: &[u8]) -> Result<Credentials, SocksError> {
    let version = *bytes
        .first()
        .ok_or_else(|| SocksError::truncated("credentials version"))?;
    if version != USERPASS_VERSION {
        return Err(SocksError::unsupported_version(version));
    }
    let rest = &bytes[1..];
    let ulen = *rest
        .first()
        .ok_or_else(|| SocksError::truncated("username length"))? as usize;
    let rest = rest
        .get(1..)
        .ok_or_else(|| SocksError::truncated("username"))?;
    let user = rest
        .get(..ulen)
        .ok_or_else(|| SocksError::truncated("username bytes"))?;
    let rest = &rest[ulen..];

    let plen = *rest
        .first()
        .ok_or_else(|| SocksError::truncated("password length"))? as usize;
    let rest = rest
        .get(1..)
        .ok_or_else(|| SocksError::truncated("password"))?;
    let pass = rest
        .get(..plen)
        .ok_or_else(|| SocksError::truncated("password bytes"))?;

    Ok(Credentials {
        user: Bytes::copy_from_slice(user),
        pass: Bytes::copy_from_slice(pass),
    })
}

/// Encode `[version, status]`: `version` is `0x05` for method negotiation,
/// `0x01` for the credential result (§4.1 `encodeAuthResponse`).
#[must_use]
pub fn encode_auth_response(version: u8, status: u8) -> [u8; 2] {
    [version, status]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_credentials() {
        let wire = [0x01, 0x01, b'a', 0x01, b'b'];
        let creds = parse_credentials(&wire).unwrap();
        assert_eq!(creds.user.as_ref(), b"a");
        assert_eq!(creds.pass.as_ref(), b"b");
    }

    #[test]
    fn allows_empty_password() {
        let wire = [0x01, 0x01, b'a', 0x00];
        let creds = parse_credentials(&wire).unwrap();
        assert_eq!(creds.user.as_ref(), b"a");
        assert_eq!(creds.pass.as_ref(), b"");
    }

    #[test]
    fn rejects_truncated_password() {
        let wire = [0x01, 0x01, b'a', 0x02, b'b'];
        assert!(parse_credentials(&wire).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse_credentials(&[0x05, 0, 0]).unwrap_err();
        assert_eq!(err.reply_code().as_u8(), 0x01);
    }

    #[test]
    fn encodes_auth_response() {
        assert_eq!(encode_auth_response(0x05, 0x00), [0x05, 0x00]);
        assert_eq!(encode_auth_response(0x01, STATUS_FAILURE), [0x01, 0x01]);
    }
}
