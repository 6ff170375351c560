//! Server-side player state used by the anti-cheat checks.
//!
//! The client is authoritative for nothing: every claimed position is
//! charged against a [`LagPool`], and digs are timed against another.

use std::collections::HashSet;

use tracing::info;

use mt_rs_proto::types::{V3f, V3s16, BS};

use crate::inventory::{Inventory, ItemStack};
use crate::lag_pool::LagPool;

pub const PLAYER_MAX_HP: u16 = 20;

/// Eye height above the feet, in nodes.
pub const EYE_HEIGHT: f32 = 1.625;

pub const MAIN_LIST: &str = "main";
pub const HAND_LIST: &str = "hand";

/// Lists every player inventory gets, with their sizes.
pub const DEFAULT_LISTS: &[(&str, usize)] = &[
    (MAIN_LIST, 32),
    (crate::craft::CRAFT_LIST, 9),
    (crate::craft::CRAFT_PREVIEW_LIST, 1),
    (crate::craft::CRAFT_RESULT_LIST, 1),
    (HAND_LIST, 1),
];

/// Player movement limits, in world units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementSettings {
    pub speed_walk: f32,
    pub speed_fast: f32,
    pub speed_jump: f32,
    pub physics_override_speed: f32,
    pub physics_override_jump: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed_walk: 4.0 * BS,
            speed_fast: 20.0 * BS,
            speed_jump: 6.5 * BS,
            physics_override_speed: 1.0,
            physics_override_jump: 1.0,
        }
    }
}

/// Node the player started digging, and the time spent on it since.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigIntent {
    pub node_position: V3s16,
    pub elapsed: f32,
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub name: String,
    /// Position claimed by the client, world units.
    pub position: V3f,
    /// Last position that passed the movement check.
    pub last_good_position: V3f,
    pub speed: V3f,
    pub pitch: f32,
    pub yaw: f32,
    pub fov: f32,
    pub wanted_range: u8,
    pub keys_pressed: u32,
    /// Attached to another object; the server moves the player.
    pub attached: bool,
    pub hp: u16,
    pub wield_index: u16,
    pub inventory: Inventory,
    pub privileges: HashSet<String>,
    pub movement: MovementSettings,
    dig_pool: LagPool,
    move_pool: LagPool,
    time_from_last_teleport: f32,
    dig_intent: Option<DigIntent>,
}

impl PlayerState {
    pub fn new(name: &str, position: V3f, privileges: HashSet<String>) -> Self {
        let mut inventory = Inventory::new();
        for (list, size) in DEFAULT_LISTS {
            inventory.add_list(list, *size);
        }
        if let Some(craft) = inventory.list_mut(crate::craft::CRAFT_LIST) {
            craft.set_width(3);
        }
        Self {
            name: name.to_string(),
            position,
            last_good_position: position,
            speed: V3f::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            fov: 0.0,
            wanted_range: 0,
            keys_pressed: 0,
            attached: false,
            hp: PLAYER_MAX_HP,
            wield_index: 0,
            inventory,
            privileges,
            movement: MovementSettings::default(),
            dig_pool: LagPool::new(),
            move_pool: LagPool::new(),
            time_from_last_teleport: 0.0,
            dig_intent: None,
        }
    }

    pub fn has_priv(&self, privilege: &str) -> bool {
        self.privileges.contains(privilege)
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Apply damage. Returns true when this killed the player.
    pub fn damage(&mut self, amount: u16) -> bool {
        let was_alive = !self.is_dead();
        self.hp = self.hp.saturating_sub(amount);
        was_alive && self.is_dead()
    }

    pub fn eye_position(&self) -> V3f {
        self.position + V3f::new(0.0, EYE_HEIGHT * BS, 0.0)
    }

    /// Stack in the wield slot of `main`.
    pub fn wielded_item(&self) -> ItemStack {
        self.inventory
            .list(MAIN_LIST)
            .and_then(|l| l.get(self.wield_index as usize))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_wielded_item(&mut self, item: ItemStack) {
        let index = self.wield_index as usize;
        if let Some(main) = self.inventory.list_mut(MAIN_LIST) {
            main.change_item(index, item);
        }
    }

    /// Canonicalise and store client look angles.
    pub fn set_look(&mut self, pitch: f32, yaw: f32) {
        self.pitch = wrap_degrees_180(pitch);
        self.yaw = wrap_degrees_360(yaw);
    }

    /// Teleport: the new position is trusted and the move pool is spent.
    pub fn set_position(&mut self, pos: V3f) {
        self.position = pos;
        self.last_good_position = pos;
        self.move_pool.empty();
        self.time_from_last_teleport = 0.0;
    }

    pub fn time_from_last_teleport(&self) -> f32 {
        self.time_from_last_teleport
    }

    /// Advance pools and timers by one server step.
    pub fn step(&mut self, dtime: f32, lag_pool_max: f32) {
        self.dig_pool.set_max(lag_pool_max);
        self.move_pool.set_max(lag_pool_max);
        self.dig_pool.add(dtime);
        self.move_pool.add(dtime);
        self.time_from_last_teleport += dtime;
        if let Some(intent) = self.dig_intent.as_mut() {
            intent.elapsed += dtime;
        }
    }

    /// Check the claimed position against the last good one.
    ///
    /// A move the pool cannot pay for resets the position to the last good
    /// one. It only counts as cheating once the player has been away from a
    /// teleport for longer than `lag_pool_max`.
    pub fn check_movement_cheat(&mut self, anticheat: bool, lag_pool_max: f32) -> bool {
        if self.attached || !anticheat {
            self.last_good_position = self.position;
            return false;
        }

        let m = &self.movement;
        let max_walk = if self.has_priv("fast") {
            m.speed_fast
        } else {
            m.speed_walk
        } * m.physics_override_speed;
        let max_jump = m.speed_jump * m.physics_override_jump * 2.0;
        let max_walk = max_walk.max(0.0001);
        let max_jump = max_jump.max(0.0001);

        let diff = self.position - self.last_good_position;
        let d_vert = diff.y;
        let d_horiz = (diff.x * diff.x + diff.z * diff.z).sqrt();
        let mut required = d_horiz / max_walk;
        if d_vert > 0.0 {
            required = required.max(d_vert / max_jump.max(max_walk));
        }

        if self.move_pool.grab(required) {
            self.last_good_position = self.position;
            return false;
        }
        let cheated = self.time_from_last_teleport > lag_pool_max;
        if cheated {
            info!(player = %self.name, "moved too fast; resetting position");
        }
        self.position = self.last_good_position;
        cheated
    }

    /// Begin digging `pos`, replacing any earlier intent.
    pub fn dig_start(&mut self, pos: V3s16) {
        self.dig_intent = Some(DigIntent {
            node_position: pos,
            elapsed: 0.0,
        });
    }

    pub fn dig_intent(&self) -> Option<DigIntent> {
        self.dig_intent
    }

    /// Consume the dig intent.
    pub fn dig_end(&mut self) -> Option<DigIntent> {
        self.dig_intent.take()
    }

    /// Draw `time` seconds from the dig pool.
    pub fn grab_dig_time(&mut self, time: f32) -> bool {
        self.dig_pool.grab(time)
    }

    /// Draw from the dig pool when possible, but accept the dig either way.
    /// Used for long digs whose elapsed time matches the expected time.
    pub fn force_dig_time(&mut self, time: f32) {
        let _ = self.dig_pool.grab(time);
    }
}

/// Wrap to `[-180, 180)`.
pub fn wrap_degrees_180(v: f32) -> f32 {
    (v + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap to `[0, 360)`.
pub fn wrap_degrees_360(v: f32) -> f32 {
    let r = v.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        PlayerState::new("alice", V3f::ZERO, HashSet::new())
    }

    #[test]
    fn default_lists_exist() {
        let p = player();
        for (name, size) in DEFAULT_LISTS {
            assert_eq!(p.inventory.list(name).unwrap().len(), *size);
        }
    }

    #[test]
    fn angles_wrap() {
        assert_eq!(wrap_degrees_180(190.0), -170.0);
        assert_eq!(wrap_degrees_180(-180.0), -180.0);
        assert_eq!(wrap_degrees_180(180.0), -180.0);
        assert_eq!(wrap_degrees_360(-10.0), 350.0);
        assert_eq!(wrap_degrees_360(720.0), 0.0);
    }

    #[test]
    fn small_move_is_accepted() {
        let mut p = player();
        p.step(15.0, 15.0);
        p.position = V3f::new(4.0 * BS, 0.0, 0.0);
        assert!(!p.check_movement_cheat(true, 5.0));
        assert_eq!(p.last_good_position, p.position);
    }

    #[test]
    fn fast_move_right_after_teleport_is_reset_but_not_reported() {
        let mut p = player();
        p.set_position(V3f::ZERO);
        p.position = V3f::new(500.0 * BS, 0.0, 0.0);
        assert!(!p.check_movement_cheat(true, 5.0));
        assert_eq!(p.position, V3f::ZERO);
    }

    #[test]
    fn fast_move_later_is_reported() {
        let mut p = player();
        p.step(6.0, 15.0);
        p.position = V3f::new(500.0 * BS, 0.0, 0.0);
        assert!(p.check_movement_cheat(true, 5.0));
        assert_eq!(p.position, V3f::ZERO);
        assert_eq!(p.last_good_position, V3f::ZERO);
    }

    #[test]
    fn fast_privilege_raises_limit() {
        let mut p = player();
        p.privileges.insert("fast".into());
        p.step(15.0, 15.0);
        p.position = V3f::new(200.0 * BS, 0.0, 0.0);
        assert!(!p.check_movement_cheat(true, 5.0));
    }

    #[test]
    fn attached_or_disabled_skips_check() {
        let mut p = player();
        p.step(6.0, 15.0);
        p.attached = true;
        p.position = V3f::new(1000.0 * BS, 0.0, 0.0);
        assert!(!p.check_movement_cheat(true, 5.0));
        assert_eq!(p.last_good_position, p.position);

        let mut p = player();
        p.step(6.0, 15.0);
        p.position = V3f::new(1000.0 * BS, 0.0, 0.0);
        assert!(!p.check_movement_cheat(false, 5.0));
    }

    #[test]
    fn dig_intent_tracks_elapsed_time() {
        let mut p = player();
        p.dig_start(V3s16::new(1, 2, 3));
        p.step(0.5, 5.0);
        p.step(0.25, 5.0);
        let intent = p.dig_end().unwrap();
        assert_eq!(intent.node_position, V3s16::new(1, 2, 3));
        assert_eq!(intent.elapsed, 0.75);
        assert!(p.dig_end().is_none());
    }

    #[test]
    fn damage_reports_death_once() {
        let mut p = player();
        assert!(!p.damage(5));
        assert!(p.damage(100));
        assert!(!p.damage(1));
        assert!(p.is_dead());
    }

    #[test]
    fn eye_is_above_feet() {
        let p = player();
        assert_eq!(p.eye_position().y, EYE_HEIGHT * BS);
    }
}
