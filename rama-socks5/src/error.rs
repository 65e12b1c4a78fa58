//! Error types for the SOCKS5 protocol engine.
//!
//! [`SocksError`] is the typed half of this crate's error handling: every
//! variant carries enough information to compute the one-byte [`ReplyCode`]
//! the client must see (RFC 1928 §6). Failures that happen before a reply can
//! be meaningfully sent at all (listener setup, configuration) are instead
//! reported as [`rama_error::BoxError`].

use std::{fmt, io};

/// One-byte SOCKS5 reply code, per RFC 1928 §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplyCode {
    Success,
    GeneralFailure,
    NotAllowed,
    NetUnreachable,
    HostUnreachable,
    ConnRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
}

impl ReplyCode {
    /// The wire value of this reply code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::GeneralFailure => 0x01,
            Self::NotAllowed => 0x02,
            Self::NetUnreachable => 0x03,
            Self::HostUnreachable => 0x04,
            Self::ConnRefused => 0x05,
            Self::TtlExpired => 0x06,
            Self::CommandNotSupported => 0x07,
            Self::AddressTypeNotSupported => 0x08,
        }
    }

    /// Map an [`io::Error`] observed while connecting to, or binding for, a
    /// resolved target into the reply code the client should see.
    #[must_use]
    pub fn from_io_error(err: &io::Error) -> Self {
        #[cfg(unix)]
        if let Some(errno) = err.raw_os_error() {
            match errno {
                libc::ENETUNREACH | libc::ENETDOWN => return Self::NetUnreachable,
                libc::EHOSTUNREACH => return Self::HostUnreachable,
                libc::ECONNREFUSED => return Self::ConnRefused,
                libc::ETIMEDOUT => return Self::TtlExpired,
                libc::EAFNOSUPPORT | libc::EPROTOTYPE | libc::EPROTONOSUPPORT => {
                    return Self::AddressTypeNotSupported;
                }
                _ => {}
            }
        }
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnRefused,
            io::ErrorKind::TimedOut => Self::TtlExpired,
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::Unsupported => {
                Self::AddressTypeNotSupported
            }
            _ => Self::GeneralFailure,
        }
    }
}

/// [`std::error::Error`] returned by wire parsing and request handling.
///
/// Every variant knows its own [`ReplyCode`] via [`SocksError::reply_code`],
/// so callers driving the session state machine never need a second match
/// to decide what to send back to the client.
#[derive(Debug)]
pub struct SocksError(SocksErrorKind);

#[derive(Debug)]
enum SocksErrorKind {
    Truncated { context: &'static str },
    UnsupportedAddressType(u8),
    UnsupportedCommand(u8),
    UnsupportedVersion(u8),
    ReservedByteNotZero,
    FragmentedDatagram,
    CredentialsRejected,
    Io(io::Error),
}

impl SocksError {
    pub(crate) fn truncated(context: &'static str) -> Self {
        Self(SocksErrorKind::Truncated { context })
    }

    pub(crate) fn unsupported_address_type(atyp: u8) -> Self {
        Self(SocksErrorKind::UnsupportedAddressType(atyp))
    }

    pub(crate) fn unsupported_command(cmd: u8) -> Self {
        Self(SocksErrorKind::UnsupportedCommand(cmd))
    }

    pub(crate) fn unsupported_version(version: u8) -> Self {
        Self(SocksErrorKind::UnsupportedVersion(version))
    }

    pub(crate) fn reserved_byte_not_zero() -> Self {
        Self(SocksErrorKind::ReservedByteNotZero)
    }

    pub(crate) fn fragmented_datagram() -> Self {
        Self(SocksErrorKind::FragmentedDatagram)
    }

    /// The credential check in §4.2 rejected the offered user/pass pair.
    #[must_use]
    pub fn credentials_rejected() -> Self {
        Self(SocksErrorKind::CredentialsRejected)
    }

    /// The [`ReplyCode`] a SOCKS5 peer should receive for this error.
    #[must_use]
    pub fn reply_code(&self) -> ReplyCode {
        match &self.0 {
            SocksErrorKind::Truncated { .. }
            | SocksErrorKind::UnsupportedVersion(_)
            | SocksErrorKind::ReservedByteNotZero
            | SocksErrorKind::FragmentedDatagram => ReplyCode::GeneralFailure,
            SocksErrorKind::UnsupportedAddressType(_) => ReplyCode::AddressTypeNotSupported,
            SocksErrorKind::UnsupportedCommand(_) => ReplyCode::CommandNotSupported,
            SocksErrorKind::CredentialsRejected => ReplyCode::NotAllowed,
            SocksErrorKind::Io(err) => ReplyCode::from_io_error(err),
        }
    }
}

impl From<io::Error> for SocksError {
    fn from(err: io::Error) -> Self {
        Self(SocksErrorKind::Io(err))
    }
}

impl fmt::Display for SocksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            SocksErrorKind::Truncated { context } => {
                write!(f, "truncated socks5 message: {context}")
            }
            SocksErrorKind::UnsupportedAddressType(atyp) => {
                write!(f, "unsupported address type 0x{atyp:02x}")
            }
            SocksErrorKind::UnsupportedCommand(cmd) => {
                write!(f, "unsupported command 0x{cmd:02x}")
            }
            SocksErrorKind::UnsupportedVersion(version) => {
                write!(f, "unsupported protocol version 0x{version:02x}")
            }
            SocksErrorKind::ReservedByteNotZero => f.write_str("reserved byte was not zero"),
            SocksErrorKind::FragmentedDatagram => {
                f.write_str("fragmented UDP datagrams are not supported")
            }
            SocksErrorKind::CredentialsRejected => f.write_str("credentials rejected"),
            SocksErrorKind::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for SocksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            SocksErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}
