//! SRP handshake packets.

use bytes::{Buf, BufMut};

use crate::codec::{read_bytes, read_u8, write_bytes, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// FirstSrp (0x50) — Client → Server.
///
/// Registers a verifier on first login, or replaces it while in sudo mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSrp {
    pub salt: Vec<u8>,
    pub verifier: Vec<u8>,
    pub is_empty: bool,
}

impl ProtoDecode for FirstSrp {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            salt: read_bytes(buf)?,
            verifier: read_bytes(buf)?,
            is_empty: read_u8(buf)? != 0,
        })
    }
}

impl ProtoEncode for FirstSrp {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_bytes(buf, &self.salt);
        write_bytes(buf, &self.verifier);
        buf.put_u8(self.is_empty as u8);
    }
}

/// SrpBytesA (0x51) — Client → Server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpBytesA {
    pub bytes_a: Vec<u8>,
    /// 0: the verifier is derived from the legacy password hash; otherwise the stored SRP verifier.
    pub based_on: u8,
}

impl ProtoDecode for SrpBytesA {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            bytes_a: read_bytes(buf)?,
            based_on: read_u8(buf)?,
        })
    }
}

impl ProtoEncode for SrpBytesA {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_bytes(buf, &self.bytes_a);
        buf.put_u8(self.based_on);
    }
}

/// SrpBytesM (0x52) — Client → Server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpBytesM {
    pub bytes_m: Vec<u8>,
}

impl ProtoDecode for SrpBytesM {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            bytes_m: read_bytes(buf)?,
        })
    }
}

impl ProtoEncode for SrpBytesM {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_bytes(buf, &self.bytes_m);
    }
}

/// SrpBytesSB (0x60) — Server → Client: salt and the server's public value B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpBytesSB {
    pub salt: Vec<u8>,
    pub bytes_b: Vec<u8>,
}

impl ProtoEncode for SrpBytesSB {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_bytes(buf, &self.salt);
        write_bytes(buf, &self.bytes_b);
    }
}

impl ProtoDecode for SrpBytesSB {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            salt: read_bytes(buf)?,
            bytes_b: read_bytes(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn first_srp_carries_binary_values() {
        let pkt = FirstSrp {
            salt: vec![0xff, 0x00, 0x80],
            verifier: vec![0xc3; 256],
            is_empty: false,
        };
        let mut buf = BytesMut::new();
        pkt.proto_encode(&mut buf);
        assert_eq!(buf.len(), 2 + 3 + 2 + 256 + 1);
        assert_eq!(FirstSrp::proto_decode(&mut buf.freeze()).unwrap(), pkt);
    }

    #[test]
    fn bytes_a_layout() {
        let data: &[u8] = &[0, 2, 0xab, 0xcd, 1];
        let pkt = SrpBytesA::proto_decode(&mut &data[..]).unwrap();
        assert_eq!(pkt.bytes_a, vec![0xab, 0xcd]);
        assert_eq!(pkt.based_on, 1);
    }

    #[test]
    fn bytes_m_rejects_short_payload() {
        let data: &[u8] = &[0, 32, 1, 2, 3];
        assert!(SrpBytesM::proto_decode(&mut &data[..]).is_err());
    }
}
