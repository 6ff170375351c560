//! Loading-phase packets: Init2, RequestMedia and ClientReady.

use bytes::{Buf, BufMut};

use crate::codec::{need, read_string, read_u16, read_u8, write_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Init2 (0x11) — Client → Server. The language field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Init2 {
    pub language: Option<String>,
}

impl ProtoDecode for Init2 {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let language = if buf.has_remaining() {
            Some(read_string(buf)?)
        } else {
            None
        };
        Ok(Self { language })
    }
}

impl ProtoEncode for Init2 {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        if let Some(lang) = &self.language {
            write_string(buf, lang);
        }
    }
}

/// RequestMedia (0x40) — Client → Server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMedia {
    pub files: Vec<String>,
}

impl ProtoDecode for RequestMedia {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let count = read_u16(buf)? as usize;
        let files = (0..count)
            .map(|_| read_string(buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { files })
    }
}

impl ProtoEncode for RequestMedia {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.files.len() as u16);
        for f in &self.files {
            write_string(buf, f);
        }
    }
}

/// Minimum ClientReady body: four version bytes and an (empty) version string.
pub const CLIENT_READY_MIN_LEN: usize = 8;

/// ClientReady (0x43) — Client → Server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReady {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub reserved: u8,
    pub full_version: String,
}

impl ProtoDecode for ClientReady {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        need(buf, CLIENT_READY_MIN_LEN)?;
        Ok(Self {
            major: read_u8(buf)?,
            minor: read_u8(buf)?,
            patch: read_u8(buf)?,
            reserved: read_u8(buf)?,
            full_version: read_string(buf)?,
        })
    }
}

impl ProtoEncode for ClientReady {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.major);
        buf.put_u8(self.minor);
        buf.put_u8(self.patch);
        buf.put_u8(self.reserved);
        write_string(buf, &self.full_version);
        // Pad to the fixed minimum so an empty version string still passes the length check.
        let written = 4 + 2 + self.full_version.len();
        for _ in written..CLIENT_READY_MIN_LEN {
            buf.put_u8(0);
        }
    }
}
