//! Protocol primitive types: integer node positions and float vectors.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::codec::{self, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// Size of one node in world units.
pub const BS: f32 = 10.0;

/// Edge length of a map block, in nodes.
pub const MAP_BLOCKSIZE: i16 = 16;

// ---------------------------------------------------------------------------
// V3s16 (i16 x, y, z): node and block positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct V3s16 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl V3s16 {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Position of the map block containing this node.
    pub fn block_pos(&self) -> V3s16 {
        let div = |v: i16| v.div_euclid(MAP_BLOCKSIZE);
        V3s16::new(div(self.x), div(self.y), div(self.z))
    }

    /// Centre of this node in world units.
    pub fn to_world(&self) -> V3f {
        V3f::new(
            self.x as f32 * BS,
            self.y as f32 * BS,
            self.z as f32 * BS,
        )
    }

    /// Node containing a world-unit position (rounded to nearest node centre).
    pub fn from_world(v: V3f) -> Self {
        let conv = |c: f32| {
            let n = (c + BS / 2.0) / BS;
            n.floor().clamp(i16::MIN as f32, i16::MAX as f32) as i16
        };
        V3s16::new(conv(v.x), conv(v.y), conv(v.z))
    }
}

impl ProtoEncode for V3s16 {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i16(self.x);
        buf.put_i16(self.y);
        buf.put_i16(self.z);
    }
}

impl ProtoDecode for V3s16 {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        codec::need(buf, 6)?;
        Ok(Self {
            x: buf.get_i16(),
            y: buf.get_i16(),
            z: buf.get_i16(),
        })
    }
}

impl fmt::Display for V3s16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// V3f (f32 x, y, z): world-unit positions and speeds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct V3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl V3f {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &V3f) -> f32 {
        (*self - *other).length()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Read a v3s32 scaled by 100, as sent in player position updates.
    pub fn read_s32_x100(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        codec::need(buf, 12)?;
        Ok(Self::new(
            buf.get_i32() as f32 / 100.0,
            buf.get_i32() as f32 / 100.0,
            buf.get_i32() as f32 / 100.0,
        ))
    }

    pub fn write_s32_x100(&self, buf: &mut impl BufMut) {
        buf.put_i32((self.x * 100.0).round() as i32);
        buf.put_i32((self.y * 100.0).round() as i32);
        buf.put_i32((self.z * 100.0).round() as i32);
    }

    /// Read a v3f1000 (three floats scaled by 1000).
    pub fn read_f1000(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self::new(
            codec::read_f1000(buf)?,
            codec::read_f1000(buf)?,
            codec::read_f1000(buf)?,
        ))
    }

    pub fn write_f1000(&self, buf: &mut impl BufMut) {
        codec::write_f1000(buf, self.x);
        codec::write_f1000(buf, self.y);
        codec::write_f1000(buf, self.z);
    }
}

impl Add for V3f {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for V3f {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for V3f {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for V3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn block_pos_floors_negative_nodes() {
        assert_eq!(V3s16::new(0, 15, 16).block_pos(), V3s16::new(0, 0, 1));
        assert_eq!(V3s16::new(-1, -16, -17).block_pos(), V3s16::new(-1, -1, -2));
    }

    #[test]
    fn world_conversion_roundtrip() {
        let p = V3s16::new(4, -5, 6);
        let w = p.to_world();
        assert_eq!(w, V3f::new(40.0, -50.0, 60.0));
        assert_eq!(V3s16::from_world(w), p);
        // Anything within half a node maps to the same node.
        assert_eq!(V3s16::from_world(V3f::new(44.9, -45.1, 55.0)), p);
    }

    #[test]
    fn v3s16_wire_layout() {
        let mut buf = BytesMut::new();
        V3s16::new(1, -2, 3).proto_encode(&mut buf);
        assert_eq!(&buf[..], &[0x00, 0x01, 0xFF, 0xFE, 0x00, 0x03]);
        let decoded = V3s16::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, V3s16::new(1, -2, 3));
    }

    #[test]
    fn v3s16_too_short() {
        let mut buf: &[u8] = &[0x00, 0x01, 0x00];
        assert!(V3s16::proto_decode(&mut buf).is_err());
    }

    #[test]
    fn scaled_position() {
        let mut buf = BytesMut::new();
        V3f::new(12.5, -3.25, 0.0).write_s32_x100(&mut buf);
        assert_eq!(&buf[..4], &1250i32.to_be_bytes());
        let v = V3f::read_s32_x100(&mut buf.freeze()).unwrap();
        assert_eq!(v, V3f::new(12.5, -3.25, 0.0));
    }

    #[test]
    fn vector_distance() {
        let a = V3f::new(0.0, 0.0, 0.0);
        let b = V3f::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
