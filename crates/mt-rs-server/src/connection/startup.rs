//! Loading phase: INIT2, media requests, CLIENT_READY and block acknowledgements.

use super::*;

use mt_rs_proto::packets::{BlockList, ClientReady, Init2, RequestMedia};

use crate::session::ClientVersion;

impl ConnectionHandler {
    pub(super) fn handle_init2(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let init2 = match Init2::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad INIT2 from {handle}: {e}");
                return;
            }
        };
        let Some(Transition::Changed(_)) = self.notify(handle, ClientEvent::GotInit2) else {
            return;
        };
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        let protocol_version = self
            .registry
            .lock()
            .get(handle)
            .map_or(0, |s| s.protocol_version);

        {
            let env = self.env.lock();
            debug!(
                "{addr}: sending definitions to {name} ({} items, language {:?})",
                env.defs.items.len(),
                init2.language
            );
        }
        self.notify(handle, ClientEvent::SetDefinitionsSent);

        if protocol_version < packets::LATEST_PROTOCOL_VERSION {
            self.send_chat(
                addr,
                "# Server: WARNING: YOUR CLIENT'S VERSION MAY NOT BE FULLY COMPATIBLE WITH THIS SERVER!",
            );
        }
    }

    pub(super) fn handle_request_media(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        match RequestMedia::proto_decode(buf) {
            Ok(req) => debug!("{handle}: requested {} media files", req.files.len()),
            Err(e) => warn!("Bad REQUEST_MEDIA from {handle}: {e}"),
        }
    }

    pub(super) fn handle_received_media(&self, handle: SessionHandle, _buf: &mut Cursor<&[u8]>) {
        debug!("{handle}: finished receiving media");
    }

    pub(super) fn handle_client_ready(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let (addr, name, state) = match self.registry.lock().get(handle) {
            Some(s) => (s.address, s.name.clone(), s.state()),
            None => return,
        };
        if state != ClientState::DefinitionsSent {
            debug!("{addr}: CLIENT_READY in {state:?}; ignoring");
            return;
        }

        if self.env.lock().world.player(&name).is_some() {
            info!("{addr}: {name} already has a player in the world");
            self.deny_access(handle, AccessDeniedCode::AlreadyConnected);
            return;
        }

        let ready = match ClientReady::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("{addr}: short CLIENT_READY from {name}: {e}");
                self.outbound.disconnect(addr);
                self.remove_session(handle, false);
                return;
            }
        };

        let privileges: HashSet<String> = self.auth.lock().privileges(&name).into_iter().collect();
        let player = PlayerState::new(&name, self.spawn_position, privileges);
        let (inventory, position_packet, hp, others) = {
            let mut env = self.env.lock();
            if !env.add_player(player) {
                drop(env);
                self.deny_access(handle, AccessDeniedCode::AlreadyConnected);
                return;
            }
            let Some(player) = env.world.player(&name) else {
                return;
            };
            (
                packets::InventoryData {
                    text: player.inventory.serialize(),
                },
                packets::MovePlayer {
                    position: player.position,
                    pitch: player.pitch,
                    yaw: player.yaw,
                },
                player.hp,
                env.world.player_names(),
            )
        };

        {
            let mut registry = self.registry.lock();
            let Some(session) = registry.get_mut(handle) else {
                drop(registry);
                self.env.lock().remove_player(&name);
                return;
            };
            session.client_version = ClientVersion {
                major: ready.major,
                minor: ready.minor,
                patch: ready.patch,
                full: ready.full_version.clone(),
            };
            session.player_joined = true;
        }

        self.send(addr, id::toclient::INVENTORY, &inventory);
        self.send(addr, id::toclient::MOVE_PLAYER, &position_packet);
        self.send_hp(addr, hp);
        self.send(
            addr,
            id::toclient::UPDATE_PLAYER_LIST,
            &UpdatePlayerList {
                kind: PlayerListKind::Init,
                names: others,
            },
        );
        let added = UpdatePlayerList {
            kind: PlayerListKind::Add,
            names: vec![name.clone()],
        };
        for (_, peer) in self.in_game_peers(Some(handle)) {
            self.send(peer, id::toclient::UPDATE_PLAYER_LIST, &added);
        }

        self.notify(handle, ClientEvent::SetClientReady);
        let joined = self.env.lock().world.player(&name).map(script_player);
        if let Some(sp) = joined {
            self.hooks.lock().on_joinplayer(&sp);
        }
        info!(
            "{name} [{}] joins game (client {}.{}.{} {})",
            addr.ip(),
            ready.major,
            ready.minor,
            ready.patch,
            ready.full_version
        );
    }

    pub(super) fn handle_got_blocks(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let list = match BlockList::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad GOTBLOCKS from {handle}: {e}");
                return;
            }
        };
        if let Some(session) = self.registry.lock().get_mut(handle) {
            for block in list.blocks {
                session.set_block_acked(block);
            }
        }
    }

    pub(super) fn handle_deleted_blocks(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let list = match BlockList::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad DELETEDBLOCKS from {handle}: {e}");
                return;
            }
        };
        if let Some(session) = self.registry.lock().get_mut(handle) {
            for block in list.blocks {
                session.set_block_not_sent(block);
            }
        }
    }
}
