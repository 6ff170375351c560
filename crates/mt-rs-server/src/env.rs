//! The server environment: players, nodes, active objects and inventories.
//!
//! Map storage is out of scope; the world is a flat default terrain with
//! sparse node overrides.

use std::collections::{HashMap, VecDeque};

use mt_rs_game::inventory::InventoryStore;
use mt_rs_game::node::AIR;
use mt_rs_game::{
    CraftRegistry, Inventory, InventoryList, ItemDefManager, ItemStack, MaxLagEstimate,
    NodeDefManager, PlayerState,
};
use mt_rs_proto::inventory::InventoryLocation;
use mt_rs_proto::types::{V3f, V3s16};

use crate::rollback::{RollbackAction, RollbackLog};

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    DroppedItem(ItemStack),
}

/// Dropped items vanish after this many seconds.
pub const DROPPED_ITEM_TTL: f32 = 900.0;
/// At most this many dropped items exist; the oldest goes first.
pub const MAX_DROPPED_ITEMS: usize = 4096;

#[derive(Debug, Clone)]
pub struct ActiveObject {
    pub id: u16,
    pub position: V3f,
    pub kind: ObjectKind,
    /// Seconds since the object was added.
    pub age: f32,
}

pub struct DetachedInventory {
    pub inventory: Inventory,
    /// Only this player may modify it; `None` means anyone.
    pub owner: Option<String>,
}

#[derive(Default)]
pub struct World {
    players: HashMap<String, PlayerState>,
    nodes: HashMap<V3s16, String>,
    objects: HashMap<u16, ActiveObject>,
    /// Dropped item ids, oldest first.
    dropped: VecDeque<u16>,
    next_object_id: u16,
    node_meta: HashMap<V3s16, Inventory>,
    detached: HashMap<String, DetachedInventory>,
}

impl World {
    /// Stone below y = -3, dirt up to y = 0, air above, unless overridden.
    pub fn get_node(&self, pos: V3s16) -> &str {
        if let Some(name) = self.nodes.get(&pos) {
            return name;
        }
        match pos.y {
            y if y < -3 => "default:stone",
            y if y < 0 => "default:dirt",
            _ => AIR,
        }
    }

    fn set_node_raw(&mut self, pos: V3s16, name: &str) -> String {
        let old = self.get_node(pos).to_string();
        self.nodes.insert(pos, name.to_string());
        old
    }

    pub fn player(&self, name: &str) -> Option<&PlayerState> {
        self.players.get(name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut PlayerState> {
        self.players.get_mut(name)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn player_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn object(&self, id: u16) -> Option<&ActiveObject> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ActiveObject> {
        self.objects.values()
    }

    /// Add an object, evicting the oldest dropped item when the cap is hit.
    /// Returns `None` when every id is taken.
    pub fn add_object(&mut self, position: V3f, kind: ObjectKind) -> Option<u16> {
        let dropped = matches!(kind, ObjectKind::DroppedItem(_));
        if dropped && self.dropped.len() >= MAX_DROPPED_ITEMS {
            if let Some(oldest) = self.dropped.pop_front() {
                self.objects.remove(&oldest);
            }
        }
        let id = self.free_object_id()?;
        self.next_object_id = id;
        if dropped {
            self.dropped.push_back(id);
        }
        self.objects.insert(
            id,
            ActiveObject {
                id,
                position,
                kind,
                age: 0.0,
            },
        );
        Some(id)
    }

    /// One pass over the id space starting after the last id; 0 is never used.
    fn free_object_id(&self) -> Option<u16> {
        let mut id = self.next_object_id;
        for _ in 0..u16::MAX {
            id = id.wrapping_add(1);
            if id == 0 {
                id = 1;
            }
            if !self.objects.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Age every object and expire dropped items past their lifetime.
    fn step_objects(&mut self, dtime: f32) {
        for object in self.objects.values_mut() {
            object.age += dtime;
        }
        // Oldest drops sit at the front of the queue.
        while let Some(id) = self.dropped.front().copied() {
            match self.objects.get(&id) {
                Some(o) if o.age < DROPPED_ITEM_TTL => break,
                _ => {
                    self.dropped.pop_front();
                    self.objects.remove(&id);
                }
            }
        }
    }

    pub fn node_inventory(&self, pos: V3s16) -> Option<&Inventory> {
        self.node_meta.get(&pos)
    }

    /// Give the node at `pos` an inventory with one list.
    pub fn create_node_inventory(&mut self, pos: V3s16, list: &str, size: usize) {
        self.node_meta
            .entry(pos)
            .or_default()
            .add_list(list, size);
    }

    pub fn detached(&self, name: &str) -> Option<&DetachedInventory> {
        self.detached.get(name)
    }

    pub fn create_detached(&mut self, name: &str, owner: Option<&str>) -> &mut Inventory {
        &mut self
            .detached
            .entry(name.to_string())
            .or_insert_with(|| DetachedInventory {
                inventory: Inventory::new(),
                owner: owner.map(str::to_string),
            })
            .inventory
    }

    pub fn inventory(&self, location: &InventoryLocation) -> Option<&Inventory> {
        match location {
            InventoryLocation::Player(name) => self.players.get(name).map(|p| &p.inventory),
            InventoryLocation::NodeMeta(pos) => self.node_meta.get(pos),
            InventoryLocation::Detached(name) => self.detached.get(name).map(|d| &d.inventory),
            InventoryLocation::Undefined | InventoryLocation::CurrentPlayer => None,
        }
    }

    pub fn inventory_mut(&mut self, location: &InventoryLocation) -> Option<&mut Inventory> {
        match location {
            InventoryLocation::Player(name) => {
                self.players.get_mut(name).map(|p| &mut p.inventory)
            }
            InventoryLocation::NodeMeta(pos) => self.node_meta.get_mut(pos),
            InventoryLocation::Detached(name) => {
                self.detached.get_mut(name).map(|d| &mut d.inventory)
            }
            InventoryLocation::Undefined | InventoryLocation::CurrentPlayer => None,
        }
    }
}

impl InventoryStore for World {
    fn list_mut(&mut self, location: &InventoryLocation, list: &str) -> Option<&mut InventoryList> {
        self.inventory_mut(location)?.list_mut(list)
    }
}

/// Item, node and craft definitions.
pub struct Definitions {
    pub items: ItemDefManager,
    pub nodes: NodeDefManager,
    pub crafts: CraftRegistry,
}

impl Definitions {
    pub fn builtin() -> Self {
        Self {
            items: ItemDefManager::builtin(),
            nodes: NodeDefManager::builtin(),
            crafts: CraftRegistry::builtin(),
        }
    }
}

pub struct Environment {
    pub world: World,
    pub defs: Definitions,
    pub rollback: RollbackLog,
    pub max_lag: MaxLagEstimate,
}

impl Environment {
    pub fn new(rollback_enabled: bool, rollback_capacity: usize) -> Self {
        Self {
            world: World::default(),
            defs: Definitions::builtin(),
            rollback: RollbackLog::new(rollback_enabled, rollback_capacity),
            max_lag: MaxLagEstimate::new(),
        }
    }

    pub fn get_node(&self, pos: V3s16) -> &str {
        self.world.get_node(pos)
    }

    /// Change a node, recording it in the rollback log. Returns the old name.
    pub fn set_node(&mut self, pos: V3s16, name: &str) -> String {
        let old = self.world.set_node_raw(pos, name);
        if old != name {
            self.rollback.record(RollbackAction::NodeSet {
                pos,
                old: old.clone(),
                new: name.to_string(),
            });
        }
        old
    }

    pub fn remove_node(&mut self, pos: V3s16) -> String {
        self.set_node(pos, AIR)
    }

    pub fn record_inventory_change(&mut self, location: &InventoryLocation, list: &str) {
        self.rollback.record(RollbackAction::InventoryModified {
            location: location.clone(),
            list: list.to_string(),
        });
    }

    pub fn add_player(&mut self, player: PlayerState) -> bool {
        if self.world.players.contains_key(&player.name) {
            return false;
        }
        self.world.players.insert(player.name.clone(), player);
        true
    }

    pub fn remove_player(&mut self, name: &str) -> Option<PlayerState> {
        self.world.players.remove(name)
    }

    pub fn lag_pool_max(&self) -> f32 {
        self.max_lag.pool_max()
    }

    /// Advance lag estimation and every player's pools and timers.
    pub fn step(&mut self, dtime: f32) {
        self.max_lag.update(dtime);
        let pool_max = self.max_lag.pool_max();
        for player in self.world.players.values_mut() {
            player.step(dtime, pool_max);
        }
        self.world.step_objects(dtime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_rs_game::inventory::move_item;
    use mt_rs_proto::inventory::SlotRef;
    use std::collections::HashSet;

    #[test]
    fn default_terrain() {
        let env = Environment::new(false, 0);
        assert_eq!(env.get_node(V3s16::new(0, -10, 0)), "default:stone");
        assert_eq!(env.get_node(V3s16::new(0, -1, 0)), "default:dirt");
        assert_eq!(env.get_node(V3s16::new(0, 0, 0)), AIR);
    }

    #[test]
    fn set_node_records_only_changes() {
        let mut env = Environment::new(true, 10);
        let p = V3s16::new(1, 1, 1);
        assert_eq!(env.set_node(p, "default:wood"), AIR);
        assert_eq!(env.set_node(p, "default:wood"), "default:wood");
        assert_eq!(env.rollback.len(), 1);
        assert_eq!(env.remove_node(p), "default:wood");
        assert_eq!(env.get_node(p), AIR);
    }

    #[test]
    fn players_are_unique_by_name() {
        let mut env = Environment::new(false, 0);
        assert!(env.add_player(PlayerState::new("a", V3f::ZERO, HashSet::new())));
        assert!(!env.add_player(PlayerState::new("a", V3f::ZERO, HashSet::new())));
        assert!(env.remove_player("a").is_some());
        assert!(env.world.player("a").is_none());
    }

    #[test]
    fn move_between_player_and_detached() {
        let mut env = Environment::new(false, 0);
        let mut player = PlayerState::new("a", V3f::ZERO, HashSet::new());
        player.set_wielded_item(ItemStack::new("default:dirt", 10));
        env.add_player(player);
        env.world.create_detached("shop", None).add_list("stock", 4);

        let from = SlotRef {
            location: InventoryLocation::Player("a".into()),
            list: "main".into(),
            index: 0,
        };
        let to = InventoryLocation::Detached("shop".into());
        let moved = move_item(
            &mut env.world,
            &env.defs.items,
            &from,
            &to,
            "stock",
            Some(2),
            4,
        );
        assert_eq!(moved, Some(4));
        let stock = env.world.inventory(&to).unwrap().list("stock").unwrap();
        assert_eq!(stock.get(2).unwrap().count, 4);
        assert_eq!(env.world.player("a").unwrap().wielded_item().count, 6);
    }

    fn dirt() -> ObjectKind {
        ObjectKind::DroppedItem(ItemStack::new("default:dirt", 1))
    }

    #[test]
    fn objects_get_fresh_ids() {
        let mut world = World::default();
        let a = world.add_object(V3f::ZERO, dirt()).unwrap();
        let b = world.add_object(V3f::ZERO, dirt()).unwrap();
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert!(world.object(a).is_some());
    }

    #[test]
    fn dropped_items_are_capped_oldest_first() {
        let mut world = World::default();
        let first = world.add_object(V3f::ZERO, dirt()).unwrap();
        for _ in 1..MAX_DROPPED_ITEMS {
            assert!(world.add_object(V3f::ZERO, dirt()).is_some());
        }
        assert_eq!(world.objects().count(), MAX_DROPPED_ITEMS);

        let newest = world.add_object(V3f::ZERO, dirt()).unwrap();
        assert_eq!(world.objects().count(), MAX_DROPPED_ITEMS);
        assert!(world.object(first).is_none());
        assert!(world.object(newest).is_some());
    }

    #[test]
    fn drops_never_exhaust_the_id_space() {
        let mut world = World::default();
        for _ in 0..=u16::MAX as usize {
            assert!(world.add_object(V3f::ZERO, dirt()).is_some());
        }
        assert_eq!(world.objects().count(), MAX_DROPPED_ITEMS);
    }

    #[test]
    fn id_search_gives_up_when_full() {
        let mut world = World::default();
        for id in 1..=u16::MAX {
            world.objects.insert(
                id,
                ActiveObject {
                    id,
                    position: V3f::ZERO,
                    kind: dirt(),
                    age: 0.0,
                },
            );
        }
        assert_eq!(world.free_object_id(), None);
        assert!(world.objects.remove(&7).is_some());
        assert_eq!(world.free_object_id(), Some(7));
    }

    #[test]
    fn dropped_items_expire() {
        let mut env = Environment::new(false, 0);
        let id = env.world.add_object(V3f::ZERO, dirt()).unwrap();
        env.step(DROPPED_ITEM_TTL / 2.0);
        assert!(env.world.object(id).is_some());
        env.step(DROPPED_ITEM_TTL / 2.0);
        assert!(env.world.object(id).is_none());
    }

    #[test]
    fn step_advances_lag_estimate() {
        let mut env = Environment::new(false, 0);
        env.step(3.0);
        assert!((env.lag_pool_max() - 6.0).abs() < 1e-4);
    }
}
