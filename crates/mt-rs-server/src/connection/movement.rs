use super::*;

use mt_rs_proto::packets::{PlayerItem, PlayerPos};

impl ConnectionHandler {
    pub(super) fn handle_player_pos(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pos = match PlayerPos::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                debug!("Short PLAYERPOS from {handle}: {e}");
                return;
            }
        };
        self.apply_player_pos(handle, &pos);
    }

    /// Store a client position report and run the movement check. Also
    /// used for the position embedded in INTERACT.
    pub(super) fn apply_player_pos(&self, handle: SessionHandle, pos: &PlayerPos) {
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        let anticheat = self.anticheat_enabled();

        let mut env = self.env.lock();
        let lag_pool_max = env.lag_pool_max();
        let Some(player) = env.world.player_mut(&name) else {
            return;
        };
        if player.is_dead() {
            debug!("{name} is dead; ignoring position");
            return;
        }

        if !player.attached {
            player.position = pos.position;
        }
        player.speed = pos.speed;
        player.set_look(pos.pitch, pos.yaw);
        player.fov = pos.fov;
        player.wanted_range = pos.wanted_range;
        player.keys_pressed = pos.keys_pressed;

        if player.check_movement_cheat(anticheat, lag_pool_max) {
            self.report_cheat(player, CheatKind::MovedTooFast);
            self.send_move_player(addr, player);
        }
    }

    pub(super) fn handle_player_item(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let item = match PlayerItem::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad PLAYERITEM from {handle}: {e}");
                return;
            }
        };
        let Some((_, name)) = self.peer(handle) else {
            return;
        };
        if let Some(player) = self.env.lock().world.player_mut(&name) {
            player.wield_index = item.index;
        }
    }
}
