//! Session-layer packet definitions.

pub mod auth;
pub mod blocks;
pub mod chat;
pub mod interact;
pub mod inventory;
pub mod mod_channel;
pub mod movement;
pub mod player;
pub mod srp;
pub mod startup;

pub use auth::{
    AcceptSudoMode, AccessDenied, AccessDeniedCode, AuthAccept, AuthMechanisms, Hello, Init,
};
pub use blocks::BlockList;
pub use chat::ChatMessage;
pub use interact::{Interact, InteractAction, PointedThing};
pub use inventory::{DetachedInventoryData, InventoryActionText, InventoryData};
pub use mod_channel::{ModChannelMsg, ModChannelName, ModChannelSignal, ModChannelSignalCode};
pub use movement::{MovePlayer, PlayerPos};
pub use player::{Damage, Hp, PlayerItem, PlayerListKind, UpdatePlayerList};
pub use srp::{FirstSrp, SrpBytesA, SrpBytesM, SrpBytesSB};
pub use startup::{ClientReady, Init2, RequestMedia};

/// Opcode ids.
pub mod id {
    /// Client → server.
    pub mod toserver {
        pub const INIT: u16 = 0x02;
        pub const INIT2: u16 = 0x11;
        pub const MODCHANNEL_JOIN: u16 = 0x17;
        pub const MODCHANNEL_LEAVE: u16 = 0x18;
        pub const MODCHANNEL_MSG: u16 = 0x19;
        pub const PLAYERPOS: u16 = 0x23;
        pub const GOTBLOCKS: u16 = 0x24;
        pub const DELETEDBLOCKS: u16 = 0x25;
        pub const INVENTORY_ACTION: u16 = 0x31;
        pub const CHAT_MESSAGE: u16 = 0x32;
        pub const DAMAGE: u16 = 0x35;
        pub const PLAYERITEM: u16 = 0x37;
        pub const RESPAWN: u16 = 0x38;
        pub const INTERACT: u16 = 0x39;
        pub const REQUEST_MEDIA: u16 = 0x40;
        pub const RECEIVED_MEDIA: u16 = 0x41;
        pub const CLIENT_READY: u16 = 0x43;
        pub const FIRST_SRP: u16 = 0x50;
        pub const SRP_BYTES_A: u16 = 0x51;
        pub const SRP_BYTES_M: u16 = 0x52;
    }

    /// Server → client.
    pub mod toclient {
        pub const HELLO: u16 = 0x02;
        pub const AUTH_ACCEPT: u16 = 0x03;
        pub const ACCEPT_SUDO_MODE: u16 = 0x04;
        pub const DENY_SUDO_MODE: u16 = 0x05;
        pub const ACCESS_DENIED: u16 = 0x0A;
        pub const INVENTORY: u16 = 0x27;
        pub const CHAT_MESSAGE: u16 = 0x30;
        pub const HP: u16 = 0x33;
        pub const MOVE_PLAYER: u16 = 0x34;
        pub const DETACHED_INVENTORY: u16 = 0x43;
        pub const UPDATE_PLAYER_LIST: u16 = 0x56;
        pub const MODCHANNEL_MSG: u16 = 0x57;
        pub const MODCHANNEL_SIGNAL: u16 = 0x58;
        pub const SRP_BYTES_S_B: u16 = 0x60;
    }
}

/// Highest map serialisation version this server writes.
pub const SER_FMT_VER_HIGHEST_WRITE: u8 = 28;

/// Lowest map serialisation version this server can still talk to.
pub const SER_FMT_VER_LOWEST_READ: u8 = 0;

pub const SERVER_PROTOCOL_VERSION_MIN: u16 = 24;
pub const SERVER_PROTOCOL_VERSION_MAX: u16 = 30;
pub const LATEST_PROTOCOL_VERSION: u16 = 30;

/// Pick the serialisation version for a client advertising `client_max`.
pub fn negotiate_ser_ver(client_max: u8) -> Option<u8> {
    Some(client_max.min(SER_FMT_VER_HIGHEST_WRITE))
        .filter(|v| (SER_FMT_VER_LOWEST_READ..=SER_FMT_VER_HIGHEST_WRITE).contains(v))
}

/// Pick a protocol version from the client's `[min, max]` range.
///
/// The server prefers its own maximum when the client supports something newer,
/// otherwise the client's maximum. Returns `None` when the ranges do not meet.
pub fn negotiate_protocol(client_min: u16, client_max: u16, strict: bool) -> Option<u16> {
    let chosen = if client_max >= SERVER_PROTOCOL_VERSION_MAX {
        SERVER_PROTOCOL_VERSION_MAX
    } else {
        client_max
    };
    if client_min > chosen
        || !(SERVER_PROTOCOL_VERSION_MIN..=SERVER_PROTOCOL_VERSION_MAX).contains(&chosen)
    {
        return None;
    }
    if strict && chosen != LATEST_PROTOCOL_VERSION {
        return None;
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_prefers_server_max() {
        assert_eq!(negotiate_protocol(24, 37, false), Some(30));
        assert_eq!(negotiate_protocol(24, 30, false), Some(30));
    }

    #[test]
    fn protocol_uses_client_max_when_older() {
        assert_eq!(negotiate_protocol(20, 27, false), Some(27));
    }

    #[test]
    fn protocol_rejects_disjoint_ranges() {
        assert_eq!(negotiate_protocol(10, 20, false), None);
        assert_eq!(negotiate_protocol(31, 40, false), None);
        assert_eq!(negotiate_protocol(28, 26, false), None);
    }

    #[test]
    fn strict_checking_wants_latest() {
        assert_eq!(negotiate_protocol(24, 27, true), None);
        assert_eq!(negotiate_protocol(24, 30, true), Some(30));
    }

    #[test]
    fn ser_ver_caps_at_highest() {
        assert_eq!(negotiate_ser_ver(255), Some(28));
        assert_eq!(negotiate_ser_ver(25), Some(25));
        assert_eq!(negotiate_ser_ver(0), Some(0));
    }

    #[test]
    fn opcode_spaces_do_not_collide_within_direction() {
        use id::toserver::*;
        let ids = [
            INIT,
            INIT2,
            MODCHANNEL_JOIN,
            MODCHANNEL_LEAVE,
            MODCHANNEL_MSG,
            PLAYERPOS,
            GOTBLOCKS,
            DELETEDBLOCKS,
            INVENTORY_ACTION,
            CHAT_MESSAGE,
            DAMAGE,
            PLAYERITEM,
            RESPAWN,
            INTERACT,
            REQUEST_MEDIA,
            RECEIVED_MEDIA,
            CLIENT_READY,
            FIRST_SRP,
            SRP_BYTES_A,
            SRP_BYTES_M,
        ];
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }
}
