//! The handlers' only way to reach a peer.

use std::net::SocketAddr;

use bytes::Bytes;

/// Queue packets and disconnects for a peer. Implementations must not block.
pub trait Outbound: Send + Sync {
    fn send(&self, addr: SocketAddr, opcode: u16, payload: Bytes);
    fn disconnect(&self, addr: SocketAddr);
}
