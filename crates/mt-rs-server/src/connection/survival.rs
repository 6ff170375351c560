use super::*;

use mt_rs_game::player::PLAYER_MAX_HP;
use mt_rs_proto::packets::Damage;

impl ConnectionHandler {
    pub(super) fn handle_damage(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let damage = match Damage::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad DAMAGE from {handle}: {e}");
                return;
            }
        };
        if !self.config.server.enable_damage {
            return;
        }
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };

        let mut env = self.env.lock();
        let Some(player) = env.world.player_mut(&name) else {
            return;
        };
        if player.is_dead() {
            return;
        }
        debug!("{name} takes {} damage", damage.amount);
        if player.damage(damage.amount) {
            info!("{name} died");
            self.hooks.lock().on_dieplayer(&script_player(player));
        }
        self.send_hp(addr, player.hp);
    }

    pub(super) fn handle_respawn(&self, handle: SessionHandle, _buf: &mut Cursor<&[u8]>) {
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };

        let mut env = self.env.lock();
        let Some(player) = env.world.player_mut(&name) else {
            return;
        };
        if !player.is_dead() {
            debug!("{name} asked to respawn while alive");
            return;
        }
        player.hp = PLAYER_MAX_HP;
        let placed_by_script = self
            .hooks
            .lock()
            .on_respawnplayer(&script_player(player))
            .is_cancelled();
        if !placed_by_script {
            player.set_position(self.spawn_position);
        }
        info!("{name} respawns at {}", player.position);
        self.send_hp(addr, player.hp);
        self.send_move_player(addr, player);
    }
}
