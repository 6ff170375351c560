//! INTERACT: digging, placing, using and punching, behind the distance,
//! privilege and dig-time checks.

use super::*;

use mt_rs_game::item::{DEFAULT_RANGE, HAND_ITEM};
use mt_rs_game::node::{AIR, IGNORE};
use mt_rs_game::player::MAIN_LIST;
use mt_rs_game::{get_dig_params, ItemDefinition, ItemStack};
use mt_rs_proto::inventory::InventoryLocation;
use mt_rs_proto::packets::{Interact, InteractAction, PointedThing};
use mt_rs_script_api::ScriptPointed;

use crate::env::Environment;
use crate::rollback::RollbackScope;

/// Reach added to the item range, in nodes: a cube diagonal times 1.5.
pub const INTERACT_SLACK: f32 = 2.6;

/// Pointing range of the wielded item, falling back to the hand's.
pub fn tool_range(selected: &ItemDefinition, hand: &ItemDefinition) -> f32 {
    if selected.range >= 0.0 {
        selected.range
    } else if hand.range >= 0.0 {
        hand.range
    } else {
        DEFAULT_RANGE
    }
}

/// Furthest a target may be from the player's eye, in world units.
pub fn max_interact_distance(range: f32) -> f32 {
    range * BS + INTERACT_SLACK * BS
}

pub fn within_interact_distance(distance: f32, range: f32) -> bool {
    distance <= max_interact_distance(range)
}

fn script_pointed(pointed: &PointedThing) -> ScriptPointed {
    match *pointed {
        PointedThing::Nothing => ScriptPointed::Nothing,
        PointedThing::Node { under, above } => ScriptPointed::Node {
            under: script_pos(under),
            above: script_pos(above),
        },
        PointedThing::Object { id } => ScriptPointed::Object { id },
    }
}

impl ConnectionHandler {
    pub(super) fn handle_interact(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let pkt = match Interact::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad INTERACT from {handle}: {e}");
                return;
            }
        };
        if let Some(pos) = &pkt.player_pos {
            self.apply_player_pos(handle, pos);
        }
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };

        let resend = self.interact(addr, &name, &pkt);
        self.resend_blocks(handle, &resend);
    }

    /// Run one interaction. Returns the map blocks the client must get again.
    fn interact(&self, addr: SocketAddr, name: &str, pkt: &Interact) -> Vec<V3s16> {
        let anticheat = self.anticheat_enabled();
        let mut guard = self.env.lock();
        let mut scope = RollbackScope::new(&mut guard, &format!("player:{name}"));
        let env: &mut Environment = &mut scope;

        let (under, above) = match pkt.pointed {
            PointedThing::Node { under, above } => (Some(under), Some(above)),
            _ => (None, None),
        };
        let under_block: Vec<V3s16> = under.iter().map(V3s16::block_pos).collect();

        let object_pos = match pkt.pointed {
            PointedThing::Object { id } => Some(env.world.object(id).map(|o| o.position)),
            _ => None,
        };

        let Some(player) = env.world.player_mut(name) else {
            return Vec::new();
        };
        player.wield_index = pkt.item_index;

        if player.is_dead() {
            info!("{name} tried to interact while dead; ignoring");
            self.report_cheat(player, CheatKind::InteractedWhileDead);
            return under_block;
        }

        let pointed_pos = match (under, object_pos) {
            (Some(under), _) => under.to_world(),
            (None, Some(Some(pos))) => pos,
            (None, Some(None)) => {
                debug!("{name} pointed at an object that is gone");
                return Vec::new();
            }
            (None, None) => player.eye_position(),
        };

        if !player.has_priv("interact") {
            info!(
                "{name} attempted to interact with {:?} without 'interact' privilege",
                pkt.pointed
            );
            return match (pkt.action, under, above) {
                (InteractAction::DiggingCompleted, Some(under), _) => vec![under.block_pos()],
                (InteractAction::Place, _, Some(above)) => vec![above.block_pos()],
                _ => Vec::new(),
            };
        }

        let wielded = player.wielded_item();
        let sp = script_player(player);

        let needs_reach = matches!(
            pkt.action,
            InteractAction::StartDigging
                | InteractAction::DiggingCompleted
                | InteractAction::Place
                | InteractAction::Use
        );
        if needs_reach && anticheat {
            let range = tool_range(env.defs.items.get(&wielded.name), env.defs.items.hand());
            let Some(player) = env.world.player(name) else {
                return Vec::new();
            };
            let distance = player.eye_position().distance(&pointed_pos);
            if !within_interact_distance(distance, range) {
                info!(
                    "{name} tried to access {:?} from too far: d={distance:.1}, max_d={:.1}",
                    pkt.pointed,
                    max_interact_distance(range)
                );
                self.report_cheat(player, CheatKind::InteractedTooFar);
                return under_block;
            }
        }

        let pointed = script_pointed(&pkt.pointed);
        match pkt.action {
            InteractAction::StartDigging => match pkt.pointed {
                PointedThing::Node { under, .. } => {
                    let node = env.get_node(under).to_string();
                    if node != IGNORE {
                        self.hooks.lock().node_on_punch(script_pos(under), &node, &sp);
                    }
                    if let Some(player) = env.world.player_mut(name) {
                        player.dig_start(under);
                    }
                }
                PointedThing::Object { id } => {
                    info!("{name} punches object {id} with {}", wielded.name);
                }
                PointedThing::Nothing => {}
            },
            InteractAction::StopDigging => {
                debug!("{name} stopped digging");
            }
            InteractAction::DiggingCompleted => {
                if let PointedThing::Node { under, .. } = pkt.pointed {
                    return self.complete_dig(env, addr, name, under, &wielded, anticheat);
                }
            }
            InteractAction::Place => {
                if let PointedThing::Object { id } = pkt.pointed {
                    info!("{name} right-clicks object {id}");
                    self.hooks.lock().item_on_secondary_use(&wielded.name, &sp);
                    return Vec::new();
                }
                let places_node = env.defs.items.get(&wielded.name).places_node();
                let cancelled = self
                    .hooks
                    .lock()
                    .item_on_place(&wielded.name, &sp, &pointed)
                    .is_cancelled();
                let (Some(under), Some(above)) = (under, above) else {
                    return Vec::new();
                };
                if !cancelled && places_node && !wielded.is_empty() && env.get_node(above) == AIR {
                    env.set_node(above, &wielded.name);
                    if let Some(player) = env.world.player_mut(name) {
                        let mut stack = player.wielded_item();
                        stack.take_item(1);
                        player.set_wielded_item(stack);
                        info!("{name} places node {} at {above}", wielded.name);
                        self.send_player_inventory(addr, player);
                    }
                    env.record_inventory_change(&InventoryLocation::Player(name.to_string()), MAIN_LIST);
                }
                if places_node {
                    let mut blocks = vec![above.block_pos()];
                    if under.block_pos() != above.block_pos() {
                        blocks.push(under.block_pos());
                    }
                    return blocks;
                }
            }
            InteractAction::Use => {
                info!("{name} uses {}, pointing at {:?}", wielded.name, pkt.pointed);
                self.hooks.lock().item_on_use(&wielded.name, &sp, &pointed);
            }
            InteractAction::Activate => {
                info!("{name} activates {}", wielded.name);
                self.hooks.lock().item_on_secondary_use(&wielded.name, &sp);
            }
        }
        Vec::new()
    }

    /// DIGGING_COMPLETED on a node: check the dig against the dig intent
    /// and the dig pool, then let scripts and the default digger act.
    fn complete_dig(
        &self,
        env: &mut Environment,
        addr: SocketAddr,
        name: &str,
        under: V3s16,
        wielded: &ItemStack,
        anticheat: bool,
    ) -> Vec<V3s16> {
        let node = env.get_node(under).to_string();
        let groups = env.defs.nodes.get(&node).groups.clone();
        let mut params = get_dig_params(&groups, &env.defs.items.tool_capabilities(&wielded.name));
        let mut with_tool = true;
        if !params.diggable {
            params = get_dig_params(&groups, &env.defs.items.tool_capabilities(HAND_ITEM));
            with_tool = false;
        }

        let Some(player) = env.world.player_mut(name) else {
            return Vec::new();
        };
        let intent = player.dig_end();
        let mut valid = true;
        if anticheat {
            if intent.map(|i| i.node_position) != Some(under) {
                info!(
                    "{name} started digging {:?} and completed digging {under}; not digging",
                    intent.map(|i| i.node_position)
                );
                valid = false;
                self.report_cheat(player, CheatKind::FinishedUnknownDig);
            }
            if !params.diggable {
                info!("{name} completed digging {under}, which is not diggable with tool; not digging");
                valid = false;
                self.report_cheat(player, CheatKind::DugUnbreakable);
            }
            let elapsed = intent.map_or(0.0, |i| i.elapsed);
            if valid {
                // A long dig that took about as long as it should is trusted.
                if params.time > 2.0 && elapsed * 1.2 > params.time {
                    player.force_dig_time(params.time);
                } else if !player.grab_dig_time(params.time) {
                    info!("{name} completed digging {under} too fast; not digging");
                    valid = false;
                    self.report_cheat(player, CheatKind::DugTooFast);
                }
            }
        }

        if valid && node != IGNORE {
            let sp = script_player(player);
            let cancelled = self
                .hooks
                .lock()
                .node_on_dig(script_pos(under), &node, &sp)
                .is_cancelled();
            if !cancelled && params.diggable && node != AIR {
                self.dig_node(env, addr, name, under, &node, with_tool.then_some(params.wear));
            }
        }

        if env.get_node(under) != AIR {
            vec![under.block_pos()]
        } else {
            Vec::new()
        }
    }

    /// Default digging: remove the node, hand out its drop and wear the tool.
    fn dig_node(
        &self,
        env: &mut Environment,
        addr: SocketAddr,
        name: &str,
        pos: V3s16,
        node: &str,
        wear: Option<u16>,
    ) {
        env.remove_node(pos);
        let drop = env.defs.nodes.get(node).drop.clone();
        let Some(player) = env.world.player_mut(name) else {
            return;
        };
        if !drop.is_empty() {
            if let Some(main) = player.inventory.list_mut(MAIN_LIST) {
                let leftover = main.add_item(ItemStack::new(&drop, 1), &env.defs.items);
                if !leftover.is_empty() {
                    debug!("{name} has no room for {drop}");
                }
            }
        }
        if let Some(wear) = wear.filter(|w| *w > 0) {
            let mut tool = player.wielded_item();
            if !tool.add_wear(wear) {
                info!("{name}'s {} broke", player.wielded_item().name);
            }
            player.set_wielded_item(tool);
        }
        info!("{name} digs {node} at {pos}");
        self.send_player_inventory(addr, player);
        env.record_inventory_change(&InventoryLocation::Player(name.to_string()), MAIN_LIST);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_rs_game::ItemType;

    #[test]
    fn reach_boundary() {
        let max = max_interact_distance(4.0);
        assert!(within_interact_distance(max, 4.0));
        assert!(!within_interact_distance(max + BS, 4.0));
        assert!(within_interact_distance(0.0, 4.0));
    }

    #[test]
    fn range_falls_back_to_hand() {
        let hand = ItemDefinition::new(HAND_ITEM, ItemType::None).with_range(5.0);
        let stick = ItemDefinition::new("default:stick", ItemType::Craft).with_range(-1.0);
        let pick = ItemDefinition::new("default:pick", ItemType::Tool).with_range(6.0);
        assert_eq!(tool_range(&stick, &hand), 5.0);
        assert_eq!(tool_range(&pick, &hand), 6.0);
        let no_hand = ItemDefinition::new(HAND_ITEM, ItemType::None).with_range(-1.0);
        assert_eq!(tool_range(&stick, &no_hand), DEFAULT_RANGE);
    }

    #[test]
    fn pointed_conversion() {
        let pointed = PointedThing::Node {
            under: V3s16::new(1, 2, 3),
            above: V3s16::new(1, 3, 3),
        };
        assert_eq!(
            script_pointed(&pointed),
            ScriptPointed::Node {
                under: ScriptNodePos::new(1, 2, 3),
                above: ScriptNodePos::new(1, 3, 3),
            }
        );
        assert_eq!(
            script_pointed(&PointedThing::Object { id: 7 }),
            ScriptPointed::Object { id: 7 }
        );
    }
}
