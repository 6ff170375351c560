//! ChatMessage (0x32 to server, 0x30 to client). Both directions carry one wide string.

use bytes::{Buf, BufMut};

use crate::codec::{read_wide_string, write_wide_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: String,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ProtoDecode for ChatMessage {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            message: read_wide_string(buf)?,
        })
    }
}

impl ProtoEncode for ChatMessage {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_wide_string(buf, &self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encodes_utf16_units() {
        let mut buf = BytesMut::new();
        ChatMessage::new("hé").proto_encode(&mut buf);
        assert_eq!(&buf[..], &[0, 2, 0, b'h', 0, 0xe9]);
    }

    #[test]
    fn decode_rejects_lone_surrogate() {
        let data: &[u8] = &[0, 1, 0xd8, 0x00];
        assert!(ChatMessage::proto_decode(&mut &data[..]).is_err());
    }
}
