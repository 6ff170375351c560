//! Small player-state packets: Damage, PlayerItem, Hp and the player list.

use bytes::{Buf, BufMut};

use crate::codec::{read_string, read_u16, read_u8, write_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Damage (0x35) — Client → Server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    pub amount: u16,
}

impl ProtoDecode for Damage {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            amount: read_u16(buf)?,
        })
    }
}

impl ProtoEncode for Damage {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.amount);
    }
}

/// PlayerItem (0x37) — Client → Server: the selected hotbar slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerItem {
    pub index: u16,
}

impl ProtoDecode for PlayerItem {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            index: read_u16(buf)?,
        })
    }
}

impl ProtoEncode for PlayerItem {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.index);
    }
}

/// Hp (0x33) — Server → Client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hp {
    pub hp: u16,
}

impl ProtoEncode for Hp {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.hp);
    }
}

impl ProtoDecode for Hp {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            hp: read_u16(buf)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerListKind {
    Init = 0,
    Add = 1,
    Remove = 2,
}

/// UpdatePlayerList (0x56) — Server → Client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlayerList {
    pub kind: PlayerListKind,
    pub names: Vec<String>,
}

impl ProtoEncode for UpdatePlayerList {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.kind as u8);
        buf.put_u16(self.names.len() as u16);
        for name in &self.names {
            write_string(buf, name);
        }
    }
}

impl ProtoDecode for UpdatePlayerList {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let kind = match read_u8(buf)? {
            0 => PlayerListKind::Init,
            1 => PlayerListKind::Add,
            2 => PlayerListKind::Remove,
            k => return Err(ProtoError::InvalidData(format!("player list kind {k}"))),
        };
        let count = read_u16(buf)? as usize;
        let names = (0..count)
            .map(|_| read_string(buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kind, names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn player_list_layout() {
        let mut buf = BytesMut::new();
        UpdatePlayerList {
            kind: PlayerListKind::Add,
            names: vec!["bob".into()],
        }
        .proto_encode(&mut buf);
        assert_eq!(&buf[..], &[1, 0, 1, 0, 3, b'b', b'o', b'b']);
    }

    #[test]
    fn damage_needs_two_bytes() {
        let data: &[u8] = &[5];
        assert!(Damage::proto_decode(&mut &data[..]).is_err());
        let data: &[u8] = &[0, 5];
        assert_eq!(Damage::proto_decode(&mut &data[..]).unwrap().amount, 5);
    }
}
