//! GotBlocks (0x24) and DeletedBlocks (0x25) — Client → Server.

use bytes::{Buf, BufMut};

use crate::codec::{need, read_u8, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::V3s16;

/// A list of map block positions, prefixed by a u8 count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    pub blocks: Vec<V3s16>,
}

impl ProtoDecode for BlockList {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let count = read_u8(buf)? as usize;
        need(buf, count * 6)?;
        let blocks = (0..count)
            .map(|_| V3s16::proto_decode(buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { blocks })
    }
}

impl ProtoEncode for BlockList {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let count = self.blocks.len().min(u8::MAX as usize);
        buf.put_u8(count as u8);
        for p in &self.blocks[..count] {
            p.proto_encode(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn decode_two_blocks() {
        let mut buf = BytesMut::new();
        BlockList {
            blocks: vec![V3s16::new(0, 0, 0), V3s16::new(-1, 2, -3)],
        }
        .proto_encode(&mut buf);
        assert_eq!(buf.len(), 1 + 12);
        let list = BlockList::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(list.blocks[1], V3s16::new(-1, 2, -3));
    }

    #[test]
    fn count_larger_than_payload_is_rejected() {
        let data: &[u8] = &[3, 0, 0, 0, 0, 0, 0];
        assert!(BlockList::proto_decode(&mut &data[..]).is_err());
    }
}
