//! Protocol encoding/decoding traits and helpers.
//!
//! Everything on the wire is big-endian. Strings carry a u16 length prefix,
//! long strings a u32 prefix, and wide strings a u16 count of UTF-16 units.

use bytes::{Buf, BufMut};

use crate::error::ProtoError;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Fail with `BufferTooShort` unless `n` bytes remain.
pub fn need(buf: &impl Buf, n: usize) -> Result<(), ProtoError> {
    if buf.remaining() < n {
        return Err(ProtoError::BufferTooShort {
            needed: n,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

pub fn read_u8(buf: &mut impl Buf) -> Result<u8, ProtoError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_u16(buf: &mut impl Buf) -> Result<u16, ProtoError> {
    need(buf, 2)?;
    Ok(buf.get_u16())
}

pub fn read_u32(buf: &mut impl Buf) -> Result<u32, ProtoError> {
    need(buf, 4)?;
    Ok(buf.get_u32())
}

pub fn read_i32(buf: &mut impl Buf) -> Result<i32, ProtoError> {
    need(buf, 4)?;
    Ok(buf.get_i32())
}

pub fn read_u64(buf: &mut impl Buf) -> Result<u64, ProtoError> {
    need(buf, 8)?;
    Ok(buf.get_u64())
}

/// Write a u16-prefixed byte string.
pub fn write_bytes(buf: &mut impl BufMut, data: &[u8]) {
    buf.put_u16(data.len() as u16);
    buf.put_slice(data);
}

/// Read a u16-prefixed byte string. SRP values travel this way and are not UTF-8.
pub fn read_bytes(buf: &mut impl Buf) -> Result<Vec<u8>, ProtoError> {
    let len = read_u16(buf)? as usize;
    need(buf, len)?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// Write a u16-prefixed UTF-8 string.
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    write_bytes(buf, s.as_bytes());
}

/// Read a u16-prefixed UTF-8 string.
pub fn read_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let data = read_bytes(buf)?;
    String::from_utf8(data).map_err(|_| ProtoError::InvalidUtf8)
}

/// Write a u32-prefixed byte string.
pub fn write_long_bytes(buf: &mut impl BufMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

/// Read a u32-prefixed byte string.
pub fn read_long_bytes(buf: &mut impl Buf) -> Result<Vec<u8>, ProtoError> {
    let len = read_u32(buf)? as usize;
    need(buf, len)?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// Write a wide string (u16 unit count + UTF-16 code units).
pub fn write_wide_string(buf: &mut impl BufMut, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    buf.put_u16(units.len() as u16);
    for unit in units {
        buf.put_u16(unit);
    }
}

/// Read a wide string (u16 unit count + UTF-16 code units).
pub fn read_wide_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let len = read_u16(buf)? as usize;
    need(buf, len * 2)?;
    let units: Vec<u16> = (0..len).map(|_| buf.get_u16()).collect();
    String::from_utf16(&units).map_err(|_| ProtoError::InvalidUtf16)
}

/// Write a float as an i32 scaled by 1000.
pub fn write_f1000(buf: &mut impl BufMut, v: f32) {
    buf.put_i32((v * 1000.0) as i32);
}

/// Read a float stored as an i32 scaled by 1000.
pub fn read_f1000(buf: &mut impl Buf) -> Result<f32, ProtoError> {
    Ok(read_i32(buf)? as f32 / 1000.0)
}
