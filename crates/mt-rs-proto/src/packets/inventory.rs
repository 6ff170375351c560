//! InventoryAction (0x31, Client → Server), Inventory (0x27, Server → Client)
//! and DetachedInventory (0x43, Server → Client).
//!
//! The bodies are plain text filling the rest of the packet. A detached
//! inventory is prefixed with its name.

use bytes::{Buf, BufMut};

use crate::codec::{read_string, write_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::inventory::InventoryAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryActionText {
    pub text: String,
}

impl InventoryActionText {
    pub fn parse(&self) -> Result<InventoryAction, ProtoError> {
        InventoryAction::parse(self.text.trim_end())
    }
}

impl ProtoDecode for InventoryActionText {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let raw = buf.copy_to_bytes(buf.remaining());
        let text = String::from_utf8(raw.to_vec()).map_err(|_| ProtoError::InvalidUtf8)?;
        Ok(Self { text })
    }
}

impl ProtoEncode for InventoryActionText {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(self.text.as_bytes());
    }
}

/// Serialised inventory of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryData {
    pub text: String,
}

impl ProtoEncode for InventoryData {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(self.text.as_bytes());
    }
}

impl ProtoDecode for InventoryData {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let raw = buf.copy_to_bytes(buf.remaining());
        let text = String::from_utf8(raw.to_vec()).map_err(|_| ProtoError::InvalidUtf8)?;
        Ok(Self { text })
    }
}

/// Serialised detached inventory, sent whenever it is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedInventoryData {
    pub name: String,
    pub text: String,
}

impl ProtoEncode for DetachedInventoryData {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_string(buf, &self.name);
        buf.put_slice(self.text.as_bytes());
    }
}

impl ProtoDecode for DetachedInventoryData {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let name = read_string(buf)?;
        let raw = buf.copy_to_bytes(buf.remaining());
        let text = String::from_utf8(raw.to_vec()).map_err(|_| ProtoError::InvalidUtf8)?;
        Ok(Self { name, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn action_text_parses_with_trailing_newline() {
        let data: &[u8] = b"Drop 1 current_player main 0\n";
        let pkt = InventoryActionText::proto_decode(&mut &data[..]).unwrap();
        assert!(matches!(pkt.parse().unwrap(), InventoryAction::Drop { .. }));
    }

    #[test]
    fn detached_inventory_carries_name_prefix() {
        let mut buf = BytesMut::new();
        DetachedInventoryData {
            name: "shop".into(),
            text: "EndInventory\n".into(),
        }
        .proto_encode(&mut buf);
        assert_eq!(&buf[..6], &[0, 4, b's', b'h', b'o', b'p']);
        let back = DetachedInventoryData::proto_decode(&mut &buf[..]).unwrap();
        assert_eq!(back.name, "shop");
        assert_eq!(back.text, "EndInventory\n");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let data: &[u8] = &[0xff, 0xfe];
        assert!(InventoryActionText::proto_decode(&mut &data[..]).is_err());
    }
}
