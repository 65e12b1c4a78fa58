//! The two relay kinds driven by a session once a request succeeds (§4.3, §4.4).

pub mod tcp;
pub mod udp;

pub use tcp::copy_bidirectional;
pub use udp::{copy_loop_udp, UdpFlowTable};
