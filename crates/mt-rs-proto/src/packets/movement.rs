//! PlayerPos (0x23, Client → Server) and MovePlayer (0x34, Server → Client).

use bytes::{Buf, BufMut};

use crate::codec::{
    need, read_f1000, read_i32, read_u32, read_u8, write_f1000, ProtoDecode, ProtoEncode,
};
use crate::error::ProtoError;
use crate::types::V3f;

/// PlayerPos body: position, speed, pitch, yaw, keys, fov and wanted range.
pub const PLAYERPOS_LEN: usize = 12 + 12 + 4 + 4 + 4 + 1 + 1;

/// Client position report, also embedded at the end of Interact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPos {
    /// World units.
    pub position: V3f,
    pub speed: V3f,
    /// Degrees.
    pub pitch: f32,
    pub yaw: f32,
    pub keys_pressed: u32,
    pub fov: f32,
    pub wanted_range: u8,
}

impl ProtoDecode for PlayerPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        need(buf, PLAYERPOS_LEN)?;
        let position = V3f::read_s32_x100(buf)?;
        let speed = V3f::read_s32_x100(buf)?;
        let pitch = read_i32(buf)? as f32 / 100.0;
        let yaw = read_i32(buf)? as f32 / 100.0;
        let keys_pressed = read_u32(buf)?;
        let fov = read_u8(buf)? as f32 / 80.0;
        let wanted_range = read_u8(buf)?;
        Ok(Self {
            position,
            speed,
            pitch,
            yaw,
            keys_pressed,
            fov,
            wanted_range,
        })
    }
}

impl ProtoEncode for PlayerPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.position.write_s32_x100(buf);
        self.speed.write_s32_x100(buf);
        buf.put_i32((self.pitch * 100.0).round() as i32);
        buf.put_i32((self.yaw * 100.0).round() as i32);
        buf.put_u32(self.keys_pressed);
        buf.put_u8((self.fov * 80.0).clamp(0.0, 255.0) as u8);
        buf.put_u8(self.wanted_range);
    }
}

/// Authoritative position sent to correct a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlayer {
    pub position: V3f,
    pub pitch: f32,
    pub yaw: f32,
}

impl ProtoEncode for MovePlayer {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.position.write_f1000(buf);
        write_f1000(buf, self.pitch);
        write_f1000(buf, self.yaw);
    }
}

impl ProtoDecode for MovePlayer {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            position: V3f::read_f1000(buf)?,
            pitch: read_f1000(buf)?,
            yaw: read_f1000(buf)?,
        })
    }
}
