//! Minimal UDP transport.
//!
//! Every datagram starts with a frame kind: `0` data (u16 opcode, payload),
//! `1` ping, `2` disconnect. Delivery is best-effort; there is no
//! reliability or ordering layer.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{info, trace, warn};

use crate::outbound::Outbound;

const RECV_BUF_SIZE: usize = 64 * 1024;

const FRAME_DATA: u8 = 0;
const FRAME_PING: u8 = 1;
const FRAME_DISCONNECT: u8 = 2;

/// Something a peer sent.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Packet {
        addr: SocketAddr,
        opcode: u16,
        payload: Bytes,
    },
    Ping {
        addr: SocketAddr,
    },
    Disconnected {
        addr: SocketAddr,
    },
}

#[derive(Debug)]
enum TransportCommand {
    Send {
        addr: SocketAddr,
        opcode: u16,
        payload: Bytes,
    },
    Disconnect {
        addr: SocketAddr,
    },
}

/// Cloneable, non-blocking handle used by the handlers.
#[derive(Clone)]
pub struct TransportHandle {
    command_tx: mpsc::UnboundedSender<TransportCommand>,
}

impl Outbound for TransportHandle {
    fn send(&self, addr: SocketAddr, opcode: u16, payload: Bytes) {
        let _ = self.command_tx.send(TransportCommand::Send {
            addr,
            opcode,
            payload,
        });
    }

    fn disconnect(&self, addr: SocketAddr) {
        let _ = self
            .command_tx
            .send(TransportCommand::Disconnect { addr });
    }
}

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    event_tx: mpsc::Sender<TransportEvent>,
    command_rx: mpsc::UnboundedReceiver<TransportCommand>,
}

impl UdpTransport {
    /// Bind the socket. Returns the transport, the event receiver and a
    /// handle for sending.
    pub async fn bind(
        addr: SocketAddr,
    ) -> std::io::Result<(Self, mpsc::Receiver<TransportEvent>, TransportHandle)> {
        let socket = UdpSocket::bind(addr).await?;
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!("UDP transport bound on {}", socket.local_addr()?);

        Ok((
            Self {
                socket: Arc::new(socket),
                event_tx,
                command_rx,
            },
            event_rx,
            TransportHandle { command_tx },
        ))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run until the shutdown signal. Queued sends are flushed first.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut recv_buf = vec![0u8; RECV_BUF_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut recv_buf) => {
                    match result {
                        Ok((len, addr)) => {
                            match decode_frame(&recv_buf[..len], addr) {
                                Some(event) => {
                                    if self.event_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                None => trace!("Dropping malformed datagram from {addr}"),
                            }
                        }
                        Err(e) => warn!("UDP recv error: {e}"),
                    }
                }
                Some(cmd) = self.command_rx.recv() => {
                    self.execute(cmd).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        while let Ok(cmd) = self.command_rx.try_recv() {
                            self.execute(cmd).await;
                        }
                        info!("UDP transport shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn execute(&self, cmd: TransportCommand) {
        let (addr, datagram) = match cmd {
            TransportCommand::Send {
                addr,
                opcode,
                payload,
            } => (addr, encode_data(opcode, &payload)),
            TransportCommand::Disconnect { addr } => (addr, Bytes::from_static(&[FRAME_DISCONNECT])),
        };
        if let Err(e) = self.socket.send_to(&datagram, addr).await {
            warn!("UDP send to {addr} failed: {e}");
        }
    }
}

pub fn encode_data(opcode: u16, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(3 + payload.len());
    buf.put_u8(FRAME_DATA);
    buf.put_u16(opcode);
    buf.put_slice(payload);
    buf.freeze()
}

pub fn decode_frame(datagram: &[u8], addr: SocketAddr) -> Option<TransportEvent> {
    let mut buf = datagram;
    if !buf.has_remaining() {
        return None;
    }
    match buf.get_u8() {
        FRAME_DATA => {
            if buf.remaining() < 2 {
                return None;
            }
            let opcode = buf.get_u16();
            Some(TransportEvent::Packet {
                addr,
                opcode,
                payload: Bytes::copy_from_slice(buf),
            })
        }
        FRAME_PING => Some(TransportEvent::Ping { addr }),
        FRAME_DISCONNECT => Some(TransportEvent::Disconnected { addr }),
        _ => None,
    }
}
