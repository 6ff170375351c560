//! Interact (0x39) — Client → Server.
//!
//! ```text
//! u8     action
//! u16    wield item index
//! u32 + bytes  pointed thing
//! ...    trailing PlayerPos block
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{
    read_long_bytes, read_u16, read_u8, write_long_bytes, ProtoDecode, ProtoEncode,
};
use crate::error::ProtoError;
use crate::packets::movement::{PlayerPos, PLAYERPOS_LEN};
use crate::types::V3s16;

/// What the player did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InteractAction {
    /// Start digging a node, or punch an object.
    StartDigging = 0,
    StopDigging = 1,
    DiggingCompleted = 2,
    /// Place the wielded item.
    Place = 3,
    /// Use the wielded item.
    Use = 4,
    /// Rightclick an object.
    Activate = 5,
}

impl InteractAction {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        Ok(match v {
            0 => Self::StartDigging,
            1 => Self::StopDigging,
            2 => Self::DiggingCompleted,
            3 => Self::Place,
            4 => Self::Use,
            5 => Self::Activate,
            _ => return Err(ProtoError::InvalidData(format!("interact action {v}"))),
        })
    }
}

/// The target of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointedThing {
    #[default]
    Nothing,
    Node {
        under: V3s16,
        above: V3s16,
    },
    Object {
        id: u16,
    },
}

impl PointedThing {
    const VERSION: u8 = 0;

    pub fn is_nothing(&self) -> bool {
        matches!(self, PointedThing::Nothing)
    }
}

impl ProtoDecode for PointedThing {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let version = read_u8(buf)?;
        if version != Self::VERSION {
            return Err(ProtoError::InvalidData(format!(
                "unsupported pointed thing version {version}"
            )));
        }
        match read_u8(buf)? {
            0 => Ok(PointedThing::Nothing),
            1 => Ok(PointedThing::Node {
                under: V3s16::proto_decode(buf)?,
                above: V3s16::proto_decode(buf)?,
            }),
            2 => Ok(PointedThing::Object {
                id: read_u16(buf)?,
            }),
            t => Err(ProtoError::InvalidData(format!("pointed thing type {t}"))),
        }
    }
}

impl ProtoEncode for PointedThing {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(Self::VERSION);
        match self {
            PointedThing::Nothing => buf.put_u8(0),
            PointedThing::Node { under, above } => {
                buf.put_u8(1);
                under.proto_encode(buf);
                above.proto_encode(buf);
            }
            PointedThing::Object { id } => {
                buf.put_u8(2);
                buf.put_u16(*id);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interact {
    pub action: InteractAction,
    pub item_index: u16,
    pub pointed: PointedThing,
    /// Absent when the client sent a truncated position block.
    pub player_pos: Option<PlayerPos>,
}

impl ProtoDecode for Interact {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let action = InteractAction::from_u8(read_u8(buf)?)?;
        let item_index = read_u16(buf)?;
        let pointed_raw = read_long_bytes(buf)?;
        let pointed = PointedThing::proto_decode(&mut &pointed_raw[..])?;
        let player_pos = if buf.remaining() >= PLAYERPOS_LEN {
            Some(PlayerPos::proto_decode(buf)?)
        } else {
            None
        };
        Ok(Self {
            action,
            item_index,
            pointed,
            player_pos,
        })
    }
}

impl ProtoEncode for Interact {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.action as u8);
        buf.put_u16(self.item_index);
        let mut pointed = BytesMut::new();
        self.pointed.proto_encode(&mut pointed);
        write_long_bytes(buf, &pointed);
        if let Some(pos) = &self.player_pos {
            pos.proto_encode(buf);
        }
    }
}
