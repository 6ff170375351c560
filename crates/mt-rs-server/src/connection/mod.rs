//! Per-peer connection handling: the shared handler core, liveness sweep,
//! server step and session removal. Command handlers live in submodules.

mod auth;
mod channels;
mod chat;
mod dispatch;
mod interact;
mod inventory;
mod login;
mod movement;
mod startup;
mod survival;


use std::collections::HashSet;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use mt_rs_game::PlayerState;
use mt_rs_proto::codec::{ProtoDecode, ProtoEncode};
use mt_rs_proto::packets::{
    self, id, AccessDenied, AccessDeniedCode, AuthMechanisms, ChatMessage, PlayerListKind,
    UpdatePlayerList,
};
use mt_rs_proto::types::{V3f, V3s16, BS};
use mt_rs_script_api::{CheatKind, HookChain, ScriptHooks, ScriptNodePos, ScriptPlayer};

use crate::auth_store::AuthStore;
use crate::config::ServerConfig;
use crate::env::Environment;
use crate::modchannel::ModChannelManager;
use crate::outbound::Outbound;
use crate::permissions::BanManager;
use crate::pool::Job;
use crate::session::{ClientEvent, ClientState, SessionHandle, SessionRegistry, Transition};

pub use dispatch::{CommandEntry, DispatchOutcome, MinState, COMMANDS};

/// Shared by every worker. Lock order: `registry` before `env`; the
/// `auth`, `bans`, `channels` and `hooks` locks are leaves.
pub struct ConnectionHandler {
    config: Arc<ServerConfig>,
    registry: Mutex<SessionRegistry>,
    env: Mutex<Environment>,
    auth: Mutex<AuthStore>,
    bans: Mutex<BanManager>,
    channels: Mutex<ModChannelManager>,
    hooks: Mutex<HookChain>,
    outbound: Arc<dyn Outbound>,
    spawn_position: V3f,
}

impl ConnectionHandler {
    pub fn new(
        config: Arc<ServerConfig>,
        auth: AuthStore,
        bans: BanManager,
        hooks: HookChain,
        outbound: Arc<dyn Outbound>,
    ) -> Self {
        let [x, y, z] = config.server.spawn;
        let env = Environment::new(config.rollback.enabled, config.rollback.capacity);
        Self {
            spawn_position: V3f::new(x * BS, y * BS, z * BS),
            config,
            registry: Mutex::new(SessionRegistry::new()),
            env: Mutex::new(env),
            auth: Mutex::new(auth),
            bans: Mutex::new(bans),
            channels: Mutex::new(ModChannelManager::new()),
            hooks: Mutex::new(hooks),
            outbound,
        }
    }

    pub fn session_count(&self) -> usize {
        self.registry.lock().len()
    }

    // ─── Inbound ─────────────────────────────────────────────────────────

    /// Any datagram from `addr`: create its session on first contact and
    /// refresh its liveness.
    pub fn peer_seen(&self, addr: SocketAddr) -> SessionHandle {
        let now = Instant::now();
        let mut registry = self.registry.lock();
        let handle = match registry.find_by_addr(&addr) {
            Some(handle) => handle,
            None => {
                let handle = registry.create(addr, now);
                info!("Peer connected: {addr} ({handle})");
                handle
            }
        };
        if let Some(session) = registry.get_mut(handle) {
            session.last_seen = now;
        }
        handle
    }

    pub fn find_session(&self, addr: &SocketAddr) -> Option<SessionHandle> {
        self.registry.lock().find_by_addr(addr)
    }

    /// Run one queued job to completion.
    pub fn process(&self, job: Job) {
        match job {
            Job::Packet {
                handle,
                opcode,
                payload,
            } => {
                let outcome = self.dispatch(handle, opcode, &payload);
                if outcome != DispatchOutcome::Handled {
                    debug!("{handle}: opcode 0x{opcode:02x} not handled: {outcome:?}");
                }
            }
            Job::Disconnect { handle, timed_out } => {
                self.disconnect_peer(handle, timed_out);
            }
            Job::Deny { handle, code } => {
                self.deny_access(handle, code);
            }
            Job::CancelSudo { handle } => {
                let in_exchange = self
                    .registry
                    .lock()
                    .get(handle)
                    .is_some_and(|s| s.state() == ClientState::Active && s.srp.is_some());
                if in_exchange {
                    info!("{handle}: sudo handshake timed out");
                    self.deny_sudo(handle);
                }
            }
        }
    }

    // ─── Outbound helpers ────────────────────────────────────────────────

    fn send<P: ProtoEncode>(&self, addr: SocketAddr, opcode: u16, packet: &P) {
        let mut buf = BytesMut::new();
        packet.proto_encode(&mut buf);
        self.outbound.send(addr, opcode, buf.freeze());
    }

    fn send_empty(&self, addr: SocketAddr, opcode: u16) {
        self.outbound.send(addr, opcode, Bytes::new());
    }

    fn send_chat(&self, addr: SocketAddr, message: &str) {
        self.send(addr, id::toclient::CHAT_MESSAGE, &ChatMessage::new(message));
    }

    /// Sessions that have a player in the world, except `skip`.
    fn in_game_peers(&self, skip: Option<SessionHandle>) -> Vec<(SessionHandle, SocketAddr)> {
        self.registry
            .lock()
            .iter()
            .filter(|s| s.state() >= ClientState::Active && Some(s.handle) != skip)
            .map(|s| (s.handle, s.address))
            .collect()
    }

    fn broadcast_chat(&self, message: &str) {
        for (_, addr) in self.in_game_peers(None) {
            self.send_chat(addr, message);
        }
    }

    fn send_player_inventory(&self, addr: SocketAddr, player: &PlayerState) {
        self.send(
            addr,
            id::toclient::INVENTORY,
            &packets::InventoryData {
                text: player.inventory.serialize(),
            },
        );
    }

    fn send_move_player(&self, addr: SocketAddr, player: &PlayerState) {
        self.send(
            addr,
            id::toclient::MOVE_PLAYER,
            &packets::MovePlayer {
                position: player.position,
                pitch: player.pitch,
                yaw: player.yaw,
            },
        );
    }

    fn send_hp(&self, addr: SocketAddr, hp: u16) {
        self.send(addr, id::toclient::HP, &packets::Hp { hp });
    }

    // ─── Session helpers ─────────────────────────────────────────────────

    fn notify(&self, handle: SessionHandle, event: ClientEvent) -> Option<Transition> {
        self.registry
            .lock()
            .get_mut(handle)
            .map(|s| s.notify(event, Instant::now()))
    }

    /// Address and player name of a session.
    fn peer(&self, handle: SessionHandle) -> Option<(SocketAddr, String)> {
        self.registry
            .lock()
            .get(handle)
            .map(|s| (s.address, s.name.clone()))
    }

    /// Mark map blocks for resending. A vanished session is fine.
    fn resend_blocks(&self, handle: SessionHandle, blocks: &[V3s16]) {
        if blocks.is_empty() {
            return;
        }
        if let Some(session) = self.registry.lock().get_mut(handle) {
            for block in blocks {
                session.set_block_not_sent(*block);
            }
        }
    }

    fn deny_access(&self, handle: SessionHandle, code: AccessDeniedCode) {
        self.deny_access_with(handle, AccessDenied::new(code));
    }

    fn deny_access_custom(&self, handle: SessionHandle, reason: &str) {
        self.deny_access_with(handle, AccessDenied::custom(reason));
    }

    /// Send ACCESS_DENIED, drop the peer and remove the session.
    fn deny_access_with(&self, handle: SessionHandle, denial: AccessDenied) {
        let addr = {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            session.notify(ClientEvent::SetDenied, Instant::now());
            session.address
        };
        info!("Denying access to {addr}: {}", denial.reason());
        self.send(addr, id::toclient::ACCESS_DENIED, &denial);
        self.outbound.disconnect(addr);
        self.remove_session(handle, false);
    }

    /// Refuse a sudo request; the session stays `Active`.
    fn deny_sudo(&self, handle: SessionHandle) {
        let addr = {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            session.reset_auth_exchange();
            session.address
        };
        self.send_empty(addr, id::toclient::DENY_SUDO_MODE);
    }

    fn disconnect_peer(&self, handle: SessionHandle, timed_out: bool) {
        let addr = {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                return;
            };
            session.notify(ClientEvent::Disconnect, Instant::now());
            session.address
        };
        if timed_out {
            self.outbound.disconnect(addr);
        }
        self.remove_session(handle, timed_out);
    }

    /// Remove the session, leave its mod channels and take its player out
    /// of the world.
    fn remove_session(&self, handle: SessionHandle, timed_out: bool) {
        let Some(session) = self.registry.lock().remove(handle) else {
            return;
        };
        let left = self.channels.lock().leave_all(handle);
        if !left.is_empty() {
            debug!("{} left mod channels {left:?}", session.address);
        }
        if !session.player_joined {
            debug!("Session {handle} ({}) removed", session.address);
            return;
        }

        let player = self.env.lock().remove_player(&session.name);
        if let Some(player) = player {
            let sp = script_player(&player);
            self.hooks.lock().on_leaveplayer(&sp, timed_out);
        }
        let notice = UpdatePlayerList {
            kind: PlayerListKind::Remove,
            names: vec![session.name.clone()],
        };
        for (_, addr) in self.in_game_peers(None) {
            self.send(addr, id::toclient::UPDATE_PLAYER_LIST, &notice);
        }
        info!(
            "{} leaves game{}",
            session.name,
            if timed_out { " (timed out)" } else { "" }
        );
    }

    /// Report an anti-cheat violation to the scripts.
    fn report_cheat(&self, player: &PlayerState, kind: CheatKind) {
        info!("Cheat: {} {kind}", player.name);
        self.hooks.lock().on_cheat(&script_player(player), kind);
    }

    fn anticheat_enabled(&self) -> bool {
        self.config.server.anticheat_enabled()
    }

    // ─── Liveness and server step ────────────────────────────────────────

    /// Find sessions to time out. The jobs go through the worker queues so
    /// they stay ordered with the session's packets.
    pub fn sweep(&self, now: Instant) -> Vec<Job> {
        let t = &self.config.timeouts;
        let peer_timeout = Duration::from_secs(t.peer_timeout_secs);
        let linger_timeout = Duration::from_secs(t.linger_timeout_secs);
        let auth_timeout = Duration::from_secs(t.auth_timeout_secs);

        let registry = self.registry.lock();
        let mut jobs = Vec::new();
        for s in registry.iter() {
            let handle = s.handle;
            let idle = now.saturating_duration_since(s.last_seen);
            let in_state = now.saturating_duration_since(s.state_since());
            if idle > peer_timeout {
                jobs.push(Job::Disconnect {
                    handle,
                    timed_out: true,
                });
            } else if s.state() < ClientState::HelloSent && in_state > linger_timeout {
                jobs.push(Job::Disconnect {
                    handle,
                    timed_out: true,
                });
            } else if s.state() == ClientState::HelloSent && in_state > auth_timeout {
                jobs.push(Job::Deny {
                    handle,
                    code: AccessDeniedCode::UnexpectedData,
                });
            } else if s.state() == ClientState::Active
                && s
                    .srp_started
                    .is_some_and(|t| now.saturating_duration_since(t) > auth_timeout)
            {
                jobs.push(Job::CancelSudo { handle });
            }
        }
        jobs
    }

    pub fn step(&self, dtime: f32) {
        self.env.lock().step(dtime);
    }

    /// Deny every session with `Shutdown`, asking clients to reconnect.
    pub fn shutdown(&self) {
        let handles = self.registry.lock().handles();
        info!("Disconnecting {} sessions", handles.len());
        for handle in handles {
            let mut denial = AccessDenied::new(AccessDeniedCode::Shutdown);
            denial.reconnect = true;
            self.deny_access_with(handle, denial);
        }
        if let Err(e) = self.auth.lock().save() {
            warn!("Failed to save auth store: {e}");
        }
    }
}

fn script_player(player: &PlayerState) -> ScriptPlayer {
    ScriptPlayer {
        name: player.name.clone(),
        position: (player.position.x, player.position.y, player.position.z),
        hp: player.hp,
    }
}

fn script_pos(p: V3s16) -> ScriptNodePos {
    ScriptNodePos::new(p.x as i32, p.y as i32, p.z as i32)
}
