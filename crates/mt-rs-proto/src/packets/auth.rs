//! Login bootstrap packets: Init, Hello, AuthAccept, sudo replies and AccessDenied.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use bytes::{Buf, BufMut};

use crate::codec::{
    read_f1000, read_string, read_u16, read_u32, read_u64, read_u8, write_f1000, write_string,
    ProtoDecode, ProtoEncode,
};
use crate::error::ProtoError;
use crate::types::V3f;

/// Bitset of authentication mechanisms.
///
/// A single bit (or `NONE`) also names the mechanism a session has chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AuthMechanisms(pub u32);

impl AuthMechanisms {
    pub const NONE: Self = Self(0);
    /// Password hash stored in the pre-SRP format; verified through SRP on the fly.
    pub const LEGACY_PASSWORD: Self = Self(1 << 0);
    pub const SRP: Self = Self(1 << 1);
    /// Establishes a verifier: first login or a password change.
    pub const FIRST_SRP: Self = Self(1 << 2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AuthMechanisms {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuthMechanisms {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for AuthMechanisms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::LEGACY_PASSWORD) {
            names.push("legacy");
        }
        if self.contains(Self::SRP) {
            names.push("srp");
        }
        if self.contains(Self::FIRST_SRP) {
            names.push("first_srp");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Init (0x02) — Client → Server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Init {
    pub max_ser_ver: u8,
    pub supported_compression: u16,
    pub min_protocol: u16,
    pub max_protocol: u16,
    pub player_name: String,
}

impl ProtoDecode for Init {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            max_ser_ver: read_u8(buf)?,
            supported_compression: read_u16(buf)?,
            min_protocol: read_u16(buf)?,
            max_protocol: read_u16(buf)?,
            player_name: read_string(buf)?,
        })
    }
}

impl ProtoEncode for Init {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.max_ser_ver);
        buf.put_u16(self.supported_compression);
        buf.put_u16(self.min_protocol);
        buf.put_u16(self.max_protocol);
        write_string(buf, &self.player_name);
    }
}

/// Hello (0x02) — Server → Client. Answers Init with the negotiated versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub ser_ver: u8,
    pub compression_mode: u16,
    pub protocol_version: u16,
    pub auth_mechanisms: AuthMechanisms,
    /// Player name exactly as the client sent it.
    pub legacy_player_name: String,
}

impl ProtoEncode for Hello {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.ser_ver);
        buf.put_u16(self.compression_mode);
        buf.put_u16(self.protocol_version);
        buf.put_u32(self.auth_mechanisms.bits());
        write_string(buf, &self.legacy_player_name);
    }
}

impl ProtoDecode for Hello {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            ser_ver: read_u8(buf)?,
            compression_mode: read_u16(buf)?,
            protocol_version: read_u16(buf)?,
            auth_mechanisms: AuthMechanisms(read_u32(buf)?),
            legacy_player_name: read_string(buf)?,
        })
    }
}

/// AuthAccept (0x03) — Server → Client.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthAccept {
    pub spawn_position: V3f,
    pub map_seed: u64,
    pub send_interval: f32,
    pub sudo_mechanisms: AuthMechanisms,
}

impl ProtoEncode for AuthAccept {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.spawn_position.write_f1000(buf);
        buf.put_u64(self.map_seed);
        write_f1000(buf, self.send_interval);
        buf.put_u32(self.sudo_mechanisms.bits());
    }
}

impl ProtoDecode for AuthAccept {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            spawn_position: V3f::read_f1000(buf)?,
            map_seed: read_u64(buf)?,
            send_interval: read_f1000(buf)?,
            sudo_mechanisms: AuthMechanisms(read_u32(buf)?),
        })
    }
}

/// AcceptSudoMode (0x04) — Server → Client. DenySudoMode (0x05) has no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptSudoMode {
    pub sudo_mechanisms: AuthMechanisms,
}

impl ProtoEncode for AcceptSudoMode {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.sudo_mechanisms.bits());
    }
}

/// Reason codes carried by AccessDenied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccessDeniedCode {
    WrongPassword = 0,
    UnexpectedData = 1,
    Singleplayer = 2,
    WrongVersion = 3,
    WrongCharsInName = 4,
    WrongName = 5,
    TooManyUsers = 6,
    EmptyPassword = 7,
    AlreadyConnected = 8,
    ServerFail = 9,
    CustomString = 10,
    Shutdown = 11,
    Crash = 12,
}

impl AccessDeniedCode {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        Ok(match v {
            0 => Self::WrongPassword,
            1 => Self::UnexpectedData,
            2 => Self::Singleplayer,
            3 => Self::WrongVersion,
            4 => Self::WrongCharsInName,
            5 => Self::WrongName,
            6 => Self::TooManyUsers,
            7 => Self::EmptyPassword,
            8 => Self::AlreadyConnected,
            9 => Self::ServerFail,
            10 => Self::CustomString,
            11 => Self::Shutdown,
            12 => Self::Crash,
            _ => return Err(ProtoError::InvalidData(format!("access denied code {v}"))),
        })
    }

    /// Text shown to the player for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::WrongPassword => "Invalid password",
            Self::UnexpectedData => {
                "Your client sent something the server didn't expect.  Try reconnecting or updating your client"
            }
            Self::Singleplayer => {
                "The server is running in simple singleplayer mode.  You cannot connect."
            }
            Self::WrongVersion => {
                "Your client's version is not supported.\nPlease contact server administrator."
            }
            Self::WrongCharsInName => "Player name contains disallowed characters.",
            Self::WrongName => "Player name not allowed.",
            Self::TooManyUsers => "Too many users.",
            Self::EmptyPassword => {
                "Empty passwords are disallowed.  Set a password and try again."
            }
            Self::AlreadyConnected => {
                "Another client is connected with this name.  If your client closed unexpectedly, try again in a minute."
            }
            Self::ServerFail => "Server authentication failed.  This is likely a server error.",
            Self::CustomString => "",
            Self::Shutdown => "Server shutting down.",
            Self::Crash => {
                "This server has experienced an internal error. You will now be disconnected."
            }
        }
    }
}

impl fmt::Display for AccessDeniedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// AccessDenied (0x0A) — Server → Client. The connection is dropped right after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub code: AccessDeniedCode,
    pub custom_reason: String,
    pub reconnect: bool,
}

impl AccessDenied {
    pub fn new(code: AccessDeniedCode) -> Self {
        Self {
            code,
            custom_reason: String::new(),
            reconnect: false,
        }
    }

    pub fn custom(reason: impl Into<String>) -> Self {
        Self {
            code: AccessDeniedCode::CustomString,
            custom_reason: reason.into(),
            reconnect: false,
        }
    }

    /// The text a client would display.
    pub fn reason(&self) -> &str {
        if self.custom_reason.is_empty() {
            self.code.message()
        } else {
            &self.custom_reason
        }
    }
}

impl ProtoEncode for AccessDenied {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.code as u8);
        write_string(buf, &self.custom_reason);
        buf.put_u8(self.reconnect as u8);
    }
}

impl ProtoDecode for AccessDenied {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            code: AccessDeniedCode::from_u8(read_u8(buf)?)?,
            custom_reason: read_string(buf)?,
            reconnect: read_u8(buf)? != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn mechanism_bits() {
        let m = AuthMechanisms::SRP | AuthMechanisms::FIRST_SRP;
        assert_eq!(m.bits(), 6);
        assert!(m.contains(AuthMechanisms::SRP));
        assert!(!m.contains(AuthMechanisms::LEGACY_PASSWORD));
        assert!(!m.contains(AuthMechanisms::NONE));
        assert_eq!(m.to_string(), "srp|first_srp");
        assert_eq!(AuthMechanisms::NONE.to_string(), "none");
    }

    #[test]
    fn decode_init() {
        let mut buf = BytesMut::new();
        buf.put_u8(28);
        buf.put_u16(0);
        buf.put_u16(24);
        buf.put_u16(37);
        write_string(&mut buf, "Alice");
        let init = Init::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(init.max_ser_ver, 28);
        assert_eq!(init.min_protocol, 24);
        assert_eq!(init.max_protocol, 37);
        assert_eq!(init.player_name, "Alice");
    }

    #[test]
    fn truncated_init_is_an_error() {
        let data: &[u8] = &[28, 0, 0, 0, 24];
        assert!(Init::proto_decode(&mut &data[..]).is_err());
    }

    #[test]
    fn hello_layout() {
        let hello = Hello {
            ser_ver: 28,
            compression_mode: 0,
            protocol_version: 30,
            auth_mechanisms: AuthMechanisms::FIRST_SRP,
            legacy_player_name: "Al".into(),
        };
        let mut buf = BytesMut::new();
        hello.proto_encode(&mut buf);
        assert_eq!(&buf[..], &[28, 0, 0, 0, 30, 0, 0, 0, 4, 0, 2, b'A', b'l']);
    }

    #[test]
    fn access_denied_layout() {
        let mut denied = AccessDenied::new(AccessDeniedCode::Shutdown);
        denied.reconnect = true;
        let mut buf = BytesMut::new();
        denied.proto_encode(&mut buf);
        assert_eq!(&buf[..], &[11, 0, 0, 1]);
        assert_eq!(denied.reason(), "Server shutting down.");
    }

    #[test]
    fn custom_reason_wins() {
        let denied = AccessDenied::custom("Banned: griefing");
        assert_eq!(denied.code, AccessDeniedCode::CustomString);
        assert_eq!(denied.reason(), "Banned: griefing");
    }

    #[test]
    fn every_code_round_trips_through_u8() {
        for v in 0..=12u8 {
            assert_eq!(AccessDeniedCode::from_u8(v).unwrap() as u8, v);
        }
        assert!(AccessDeniedCode::from_u8(13).is_err());
    }
}
