//! Per-peer session records, the client state machine and the registry
//! that owns them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use tracing::debug;

use mt_rs_crypto::SrpVerifier;
use mt_rs_proto::packets::AuthMechanisms;
use mt_rs_proto::types::V3s16;

/// Connection states, totally ordered: a state admits every command whose
/// minimum state is at or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientState {
    Invalid,
    Disconnecting,
    Denied,
    Created,
    HelloSent,
    AwaitingInit2,
    InitDone,
    DefinitionsSent,
    Active,
    SudoMode,
}

impl ClientState {
    pub const ALL: [ClientState; 10] = [
        ClientState::Invalid,
        ClientState::Disconnecting,
        ClientState::Denied,
        ClientState::Created,
        ClientState::HelloSent,
        ClientState::AwaitingInit2,
        ClientState::InitDone,
        ClientState::DefinitionsSent,
        ClientState::Active,
        ClientState::SudoMode,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    Hello,
    AuthAccept,
    GotInit2,
    SetDefinitionsSent,
    SetClientReady,
    SudoSuccess,
    SudoLeave,
    SetDenied,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed(ClientState),
    Ignored,
}

/// Registry key: slot index plus the generation the slot had when the
/// session was created. A handle outliving its session resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Version string reported in CLIENT_READY.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub full: String,
}

pub struct Session {
    pub handle: SessionHandle,
    pub address: SocketAddr,
    state: ClientState,
    /// Empty until INIT claims a name.
    pub name: String,
    pub protocol_version: u16,
    pub ser_ver: u8,
    pub allowed_auth_mechanisms: AuthMechanisms,
    pub allowed_sudo_mechanisms: AuthMechanisms,
    pub chosen_mechanism: AuthMechanisms,
    /// Encoded password record the SRP exchange is checked against: the
    /// stored one, or the default-password record for a new account.
    pub enc_pwd: String,
    /// Live SRP exchange; only present between SRP_BYTES_A and SRP_BYTES_M.
    pub srp: Option<SrpVerifier>,
    /// When the current SRP exchange started.
    pub srp_started: Option<Instant>,
    pub create_player_on_auth_success: bool,
    pub connected_at: Instant,
    pub last_seen: Instant,
    state_since: Instant,
    pub client_version: ClientVersion,
    /// This session owns the world player named `name`.
    pub player_joined: bool,
    /// Blocks that must be resent to this client.
    pub blocks_not_sent: BTreeSet<V3s16>,
    pub blocks_acked: BTreeSet<V3s16>,
}

impl Session {
    pub fn new(handle: SessionHandle, address: SocketAddr, now: Instant) -> Self {
        Self {
            handle,
            address,
            state: ClientState::Created,
            name: String::new(),
            protocol_version: 0,
            ser_ver: 0,
            allowed_auth_mechanisms: AuthMechanisms::NONE,
            allowed_sudo_mechanisms: AuthMechanisms::NONE,
            chosen_mechanism: AuthMechanisms::NONE,
            enc_pwd: String::new(),
            srp: None,
            srp_started: None,
            create_player_on_auth_success: false,
            connected_at: now,
            last_seen: now,
            state_since: now,
            client_version: ClientVersion::default(),
            player_joined: false,
            blocks_not_sent: BTreeSet::new(),
            blocks_acked: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn state_since(&self) -> Instant {
        self.state_since
    }

    #[cfg(test)]
    pub fn force_state(&mut self, state: ClientState) {
        self.state = state;
    }

    /// Drop the chosen mechanism and any live SRP exchange.
    pub fn reset_auth_exchange(&mut self) {
        self.chosen_mechanism = AuthMechanisms::NONE;
        self.srp = None;
        self.srp_started = None;
    }

    /// Feed an event to the state machine.
    pub fn notify(&mut self, event: ClientEvent, now: Instant) -> Transition {
        use ClientEvent as E;
        use ClientState as S;

        let next = match (self.state, event) {
            (_, E::SetDenied) => S::Denied,
            (_, E::Disconnect) => S::Disconnecting,
            (S::Created, E::Hello) => S::HelloSent,
            (S::HelloSent, E::AuthAccept) => S::AwaitingInit2,
            (S::AwaitingInit2, E::GotInit2) => S::InitDone,
            (S::InitDone, E::SetDefinitionsSent) => S::DefinitionsSent,
            (S::DefinitionsSent, E::SetClientReady) => S::Active,
            (S::Active, E::SudoSuccess) => S::SudoMode,
            (S::SudoMode, E::SudoLeave) => S::Active,
            (state, event) => {
                debug!(
                    "{} ({}): ignoring {event:?} in {state:?}",
                    self.handle, self.address
                );
                return Transition::Ignored;
            }
        };

        match event {
            E::AuthAccept | E::SudoSuccess | E::SetDenied | E::Disconnect => {
                self.reset_auth_exchange()
            }
            _ => {}
        }
        self.state = next;
        self.state_since = now;
        Transition::Changed(next)
    }

    /// A block the client holds a wrong copy of.
    pub fn set_block_not_sent(&mut self, block: V3s16) {
        self.blocks_acked.remove(&block);
        self.blocks_not_sent.insert(block);
    }

    pub fn set_block_acked(&mut self, block: V3s16) {
        self.blocks_not_sent.remove(&block);
        self.blocks_acked.insert(block);
    }
}

struct Slot {
    generation: u32,
    session: Option<Session>,
}

/// Owns every session. Guarded by one lock in the connection handler.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_addr: HashMap<SocketAddr, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `address`, or return the one it already has.
    pub fn create(&mut self, address: SocketAddr, now: Instant) -> SessionHandle {
        if let Some(handle) = self.by_addr.get(&address) {
            return *handle;
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    session: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let handle = SessionHandle {
            index,
            generation: slot.generation,
        };
        slot.session = Some(Session::new(handle, address, now));
        self.by_addr.insert(address, handle);
        handle
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&Session> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.as_ref())
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut Session> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.as_mut())
    }

    /// Remove a session. The slot's generation moves on so stale handles miss.
    pub fn remove(&mut self, handle: SessionHandle) -> Option<Session> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let session = slot.session.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.by_addr.remove(&session.address);
        Some(session)
    }

    pub fn find_by_addr(&self, address: &SocketAddr) -> Option<SessionHandle> {
        self.by_addr.get(address).copied()
    }

    /// A session holding `name`, other than a denied or closing one.
    pub fn find_by_name(&self, name: &str) -> Option<SessionHandle> {
        self.iter()
            .find(|s| s.state() >= ClientState::Created && s.name == name)
            .map(|s| s.handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().filter_map(|slot| slot.session.as_ref())
    }

    pub fn handles(&self) -> Vec<SessionHandle> {
        self.iter().map(|s| s.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }

    pub fn count_at_least(&self, state: ClientState) -> usize {
        self.iter().filter(|s| s.state() >= state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn drive(session: &mut Session, events: &[ClientEvent]) {
        let now = Instant::now();
        for e in events {
            assert!(matches!(session.notify(*e, now), Transition::Changed(_)));
        }
    }

    #[test]
    fn full_login_path() {
        let mut reg = SessionRegistry::new();
        let h = reg.create(addr(1), Instant::now());
        let s = reg.get_mut(h).unwrap();
        assert_eq!(s.state(), ClientState::Created);
        drive(
            s,
            &[
                ClientEvent::Hello,
                ClientEvent::AuthAccept,
                ClientEvent::GotInit2,
                ClientEvent::SetDefinitionsSent,
                ClientEvent::SetClientReady,
            ],
        );
        assert_eq!(s.state(), ClientState::Active);
        drive(s, &[ClientEvent::SudoSuccess]);
        assert_eq!(s.state(), ClientState::SudoMode);
        drive(s, &[ClientEvent::SudoLeave]);
        assert_eq!(s.state(), ClientState::Active);
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut s = Session::new(
            SessionHandle {
                index: 0,
                generation: 0,
            },
            addr(1),
            Instant::now(),
        );
        let now = Instant::now();
        assert_eq!(s.notify(ClientEvent::GotInit2, now), Transition::Ignored);
        assert_eq!(s.notify(ClientEvent::SudoSuccess, now), Transition::Ignored);
        assert_eq!(s.notify(ClientEvent::SudoLeave, now), Transition::Ignored);
        assert_eq!(s.state(), ClientState::Created);
        drive(&mut s, &[ClientEvent::Hello]);
        assert_eq!(s.notify(ClientEvent::Hello, now), Transition::Ignored);
    }

    #[test]
    fn deny_and_disconnect_from_anywhere() {
        let now = Instant::now();
        for state_events in [
            &[][..],
            &[ClientEvent::Hello][..],
            &[ClientEvent::Hello, ClientEvent::AuthAccept][..],
        ] {
            let h = SessionHandle {
                index: 0,
                generation: 0,
            };
            let mut s = Session::new(h, addr(1), now);
            drive(&mut s, state_events);
            assert_eq!(
                s.notify(ClientEvent::SetDenied, now),
                Transition::Changed(ClientState::Denied)
            );
            assert_eq!(
                s.notify(ClientEvent::Disconnect, now),
                Transition::Changed(ClientState::Disconnecting)
            );
        }
    }

    #[test]
    fn auth_accept_clears_exchange() {
        let now = Instant::now();
        let h = SessionHandle {
            index: 0,
            generation: 0,
        };
        let mut s = Session::new(h, addr(1), now);
        drive(&mut s, &[ClientEvent::Hello]);
        s.chosen_mechanism = AuthMechanisms::SRP;
        s.srp_started = Some(now);
        drive(&mut s, &[ClientEvent::AuthAccept]);
        assert!(s.chosen_mechanism.is_none());
        assert!(s.srp_started.is_none());
    }

    #[test]
    fn stale_handles_miss_after_removal() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        let a = reg.create(addr(1), now);
        assert!(reg.remove(a).is_some());
        assert!(reg.get(a).is_none());
        assert!(reg.remove(a).is_none());

        let b = reg.create(addr(2), now);
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert!(reg.get(a).is_none());
        assert_eq!(reg.get(b).unwrap().address, addr(2));
        assert_eq!(reg.find_by_addr(&addr(1)), None);
    }

    #[test]
    fn create_is_idempotent_per_address() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        let a = reg.create(addr(1), now);
        let b = reg.create(addr(1), now);
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn find_by_name_skips_denied() {
        let mut reg = SessionRegistry::new();
        let now = Instant::now();
        let h = reg.create(addr(1), now);
        reg.get_mut(h).unwrap().name = "bob".into();
        assert_eq!(reg.find_by_name("bob"), Some(h));
        reg.get_mut(h).unwrap().notify(ClientEvent::SetDenied, now);
        assert_eq!(reg.find_by_name("bob"), None);
    }

    #[test]
    fn block_bookkeeping() {
        let h = SessionHandle {
            index: 0,
            generation: 0,
        };
        let mut s = Session::new(h, addr(1), Instant::now());
        let b = V3s16::new(0, 0, 0);
        s.set_block_acked(b);
        s.set_block_not_sent(b);
        assert!(s.blocks_not_sent.contains(&b));
        assert!(!s.blocks_acked.contains(&b));
    }
}
