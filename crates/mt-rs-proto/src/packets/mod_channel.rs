//! Mod channel packets.
//!
//! Join (0x17) and Leave (0x18) carry a channel name; Msg (0x19 to server,
//! 0x57 to client) carries a message; Signal (0x58) answers joins and leaves.

use bytes::{Buf, BufMut};

use crate::codec::{read_string, read_u8, write_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Body of ModChannelJoin and ModChannelLeave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModChannelName {
    pub channel: String,
}

impl ProtoDecode for ModChannelName {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            channel: read_string(buf)?,
        })
    }
}

impl ProtoEncode for ModChannelName {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.channel);
    }
}

/// A channel message. `sender` is empty on the client → server leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModChannelMsg {
    pub channel: String,
    pub sender: String,
    pub message: String,
}

impl ModChannelMsg {
    /// Decode the client → server form (channel, message).
    pub fn decode_from_client(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            channel: read_string(buf)?,
            sender: String::new(),
            message: read_string(buf)?,
        })
    }

    pub fn encode_from_client(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.channel);
        write_string(buf, &self.message);
    }
}

/// The server → client form (channel, sender, message).
impl ProtoEncode for ModChannelMsg {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.channel);
        write_string(buf, &self.sender);
        write_string(buf, &self.message);
    }
}

impl ProtoDecode for ModChannelMsg {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            channel: read_string(buf)?,
            sender: read_string(buf)?,
            message: read_string(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModChannelSignalCode {
    JoinOk = 0,
    JoinFailure = 1,
    LeaveOk = 2,
    LeaveFailure = 3,
    ChannelNotRegistered = 4,
}

impl ModChannelSignalCode {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        Ok(match v {
            0 => Self::JoinOk,
            1 => Self::JoinFailure,
            2 => Self::LeaveOk,
            3 => Self::LeaveFailure,
            4 => Self::ChannelNotRegistered,
            _ => return Err(ProtoError::InvalidData(format!("mod channel signal {v}"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModChannelSignal {
    pub signal: ModChannelSignalCode,
    pub channel: String,
}

impl ProtoEncode for ModChannelSignal {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.signal as u8);
        write_string(buf, &self.channel);
    }
}

impl ProtoDecode for ModChannelSignal {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            signal: ModChannelSignalCode::from_u8(read_u8(buf)?)?,
            channel: read_string(buf)?,
        })
    }
}
