//! Pure, I/O-free wire codec functions for the SOCKS5 control and UDP
//! framing (§4.1). Every function here operates on `&[u8]` in, owned bytes
//! out — none of them touch a socket, which is what makes them exercisable
//! directly from unit tests with adversarial byte strings.

pub mod greeting;
pub mod reply;
pub mod request;
pub mod udp;
pub mod userpass;

pub use greeting::{
    METHOD_INVALID, METHOD_NO_AUTH, METHOD_USERNAME_PASSWORD, encode_method_reply, parse_greeting,
};
pub use reply::encode_reply;
pub use request::{Command, parse_request};
pub use udp::{encode_udp_datagram, parse_udp_datagram};
pub use userpass::{Credentials, STATUS_FAILURE, STATUS_SUCCESS, encode_auth_response, parse_credentials};
