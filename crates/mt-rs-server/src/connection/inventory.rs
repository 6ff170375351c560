//! INVENTORY_ACTION: access control and application of move, drop and
//! craft requests.

use super::*;

use thiserror::Error;

use mt_rs_game::craft::{CRAFT_LIST, CRAFT_PREVIEW_LIST, CRAFT_RESULT_LIST};
use mt_rs_game::inventory::move_item;
use mt_rs_proto::inventory::{InventoryAction, InventoryLocation};
use mt_rs_proto::packets::{DetachedInventoryData, InventoryActionText};

use crate::env::{Environment, ObjectKind};
use crate::rollback::RollbackScope;

use super::interact::{tool_range, within_interact_distance};

/// Why an inventory request was refused. Refusals are silent to the client;
/// it just gets its inventory resent.
#[derive(Debug, Error, PartialEq)]
pub enum InventoryRefusal {
    #[error("no such player")]
    NoPlayer,
    #[error("cannot modify foreign inventory without interact privilege")]
    NoInteract,
    #[error("{0} is not accessible")]
    Inaccessible(InventoryLocation),
    #[error("node inventory at {0} is too far away")]
    TooFar(V3s16),
    #[error("cannot take items out of craftpreview")]
    FromCraftPreview,
    #[error("cannot put items into {0}")]
    IntoCraftOutput(String),
    #[error("player is dead")]
    Dead,
}

impl ConnectionHandler {
    pub(super) fn handle_inventory_action(&self, handle: SessionHandle, buf: &mut Cursor<&[u8]>) {
        let text = match InventoryActionText::proto_decode(buf) {
            Ok(p) => p,
            Err(e) => {
                warn!("Bad INVENTORY_ACTION from {handle}: {e}");
                return;
            }
        };
        let mut action = match text.parse() {
            Ok(a) => a,
            Err(e) => {
                debug!("{handle}: unusable inventory action {:?}: {e}", text.text);
                return;
            }
        };
        let Some((addr, name)) = self.peer(handle) else {
            return;
        };
        for location in action.locations_mut() {
            location.resolve_current_player(&name);
        }
        // Everything the request names is resynced, accepted or not: the
        // client may have predicted the move.
        let mut touched: Vec<InventoryLocation> =
            action.locations_mut().into_iter().map(|l| l.clone()).collect();
        touched.dedup();

        let mut detached = Vec::new();
        {
            let mut guard = self.env.lock();
            let mut scope = RollbackScope::new(&mut guard, &format!("player:{name}"));
            let env: &mut Environment = &mut scope;

            match self.check_inventory_action(env, &name, &action) {
                Ok(()) => self.apply_inventory_action(env, &name, &action),
                Err(refusal) => debug!("Ignoring '{action}' from {name}: {refusal}"),
            }

            if let Some(player) = env.world.player(&name) {
                self.send_player_inventory(addr, player);
            }
            for location in &touched {
                if let InventoryLocation::Detached(inv_name) = location {
                    match env.world.detached(inv_name) {
                        Some(inv) => detached.push(DetachedInventoryData {
                            name: inv_name.clone(),
                            text: inv.inventory.serialize(),
                        }),
                        None => debug!("{name} named unknown detached inventory {inv_name}"),
                    }
                }
            }
        }

        let mut blocks: Vec<V3s16> = touched
            .iter()
            .filter_map(|location| match location {
                InventoryLocation::NodeMeta(pos) => Some(pos.block_pos()),
                _ => None,
            })
            .collect();
        blocks.dedup();
        self.resend_blocks(handle, &blocks);
        for packet in &detached {
            self.send(addr, id::toclient::DETACHED_INVENTORY, packet);
        }
    }

    /// Access rules for one location.
    fn check_inventory_access(
        &self,
        env: &Environment,
        name: &str,
        location: &InventoryLocation,
    ) -> Result<(), InventoryRefusal> {
        let player = env.world.player(name).ok_or(InventoryRefusal::NoPlayer)?;
        let interact = player.has_priv("interact");
        if !interact && !matches!(location, InventoryLocation::Player(_)) {
            return Err(InventoryRefusal::NoInteract);
        }
        match location {
            InventoryLocation::Player(owner) if owner == name => Ok(()),
            InventoryLocation::NodeMeta(pos) => {
                let wielded = player.wielded_item();
                let range = tool_range(env.defs.items.get(&wielded.name), env.defs.items.hand());
                let distance = player.eye_position().distance(&pos.to_world());
                if within_interact_distance(distance, range) {
                    Ok(())
                } else {
                    self.report_cheat(player, CheatKind::InteractedTooFar);
                    Err(InventoryRefusal::TooFar(*pos))
                }
            }
            InventoryLocation::Detached(detached) => match env.world.detached(detached) {
                Some(inv) if inv.owner.as_deref().map_or(true, |o| o == name) => Ok(()),
                _ => Err(InventoryRefusal::Inaccessible(location.clone())),
            },
            _ => Err(InventoryRefusal::Inaccessible(location.clone())),
        }
    }

    fn check_inventory_action(
        &self,
        env: &Environment,
        name: &str,
        action: &InventoryAction,
    ) -> Result<(), InventoryRefusal> {
        let player = env.world.player(name).ok_or(InventoryRefusal::NoPlayer)?;
        let interact = player.has_priv("interact");
        match action {
            InventoryAction::Move {
                from,
                to_location,
                to_list,
                ..
            } => {
                self.check_inventory_access(env, name, &from.location)?;
                self.check_inventory_access(env, name, to_location)?;
                if from.list == CRAFT_PREVIEW_LIST {
                    return Err(InventoryRefusal::FromCraftPreview);
                }
                if to_list == CRAFT_PREVIEW_LIST || to_list == CRAFT_RESULT_LIST {
                    return Err(InventoryRefusal::IntoCraftOutput(to_list.clone()));
                }
                let own = from.location.is_player(name) && to_location.is_player(name);
                if !interact && !own {
                    return Err(InventoryRefusal::NoInteract);
                }
            }
            InventoryAction::Drop { from, .. } => {
                if from.list == CRAFT_PREVIEW_LIST {
                    return Err(InventoryRefusal::FromCraftPreview);
                }
                if !interact {
                    return Err(InventoryRefusal::NoInteract);
                }
                if player.is_dead() {
                    return Err(InventoryRefusal::Dead);
                }
                self.check_inventory_access(env, name, &from.location)?;
            }
            InventoryAction::Craft { craft_location, .. } => {
                if !interact {
                    return Err(InventoryRefusal::NoInteract);
                }
                self.check_inventory_access(env, name, craft_location)?;
            }
        }
        Ok(())
    }

    fn apply_inventory_action(&self, env: &mut Environment, name: &str, action: &InventoryAction) {
        match action {
            InventoryAction::Move {
                count,
                from,
                to_location,
                to_list,
                to_index,
            } => {
                let moved = move_item(
                    &mut env.world,
                    &env.defs.items,
                    from,
                    to_location,
                    to_list,
                    *to_index,
                    *count,
                );
                let Some(moved) = moved else {
                    debug!("{name}: inventory list missing for '{action}'");
                    return;
                };
                debug!("{name} moved {moved} items: {action}");
                for (location, list) in [(&from.location, &from.list), (to_location, to_list)] {
                    if list == CRAFT_LIST {
                        if let Some(inv) = env.world.inventory_mut(location) {
                            env.defs.crafts.update_preview(inv);
                        }
                    }
                }
                env.record_inventory_change(&from.location, &from.list);
                if from.location != *to_location || from.list != *to_list {
                    env.record_inventory_change(to_location, to_list);
                }
            }
            InventoryAction::Drop { count, from } => {
                let Some(list) = env
                    .world
                    .inventory_mut(&from.location)
                    .and_then(|inv| inv.list_mut(&from.list))
                else {
                    return;
                };
                let take = if *count == 0 { u16::MAX } else { *count };
                let dropped = list.take_item(from.index, take);
                if dropped.is_empty() {
                    return;
                }
                let Some(position) = env.world.player(name).map(|p| p.position) else {
                    return;
                };
                info!("{name} drops {dropped} at {position}");
                match env
                    .world
                    .add_object(position, ObjectKind::DroppedItem(dropped))
                {
                    Some(id) => debug!("dropped item is object {id}"),
                    None => warn!("no free object id; dropped item by {name} is lost"),
                }
                env.record_inventory_change(&from.location, &from.list);
            }
            InventoryAction::Craft {
                count,
                craft_location,
            } => {
                let Some(inv) = env.world.inventory_mut(craft_location) else {
                    return;
                };
                let crafted = env.defs.crafts.craft(inv, *count, &env.defs.items);
                if crafted > 0 {
                    info!("{name} crafted {crafted} times");
                    env.record_inventory_change(craft_location, CRAFT_LIST);
                    env.record_inventory_change(craft_location, CRAFT_RESULT_LIST);
                }
            }
        }
    }
}
