//! Inventory locations and the textual inventory action grammar.
//!
//! ```text
//! Move <count> <from_loc> <from_list> <from_i> <to_loc> <to_list> <to_i>
//! MoveSomewhere <count> <from_loc> <from_list> <from_i> <to_loc> <to_list>
//! Drop <count> <from_loc> <from_list> <from_i>
//! Craft <count> <craft_loc>
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ProtoError;
use crate::types::V3s16;

/// Where an inventory lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InventoryLocation {
    Undefined,
    /// Placeholder for "the acting player"; never valid once resolved.
    CurrentPlayer,
    Player(String),
    NodeMeta(V3s16),
    Detached(String),
}

impl InventoryLocation {
    /// Replace `CurrentPlayer` with the acting player's own location.
    pub fn resolve_current_player(&mut self, player_name: &str) {
        if *self == InventoryLocation::CurrentPlayer {
            *self = InventoryLocation::Player(player_name.to_string());
        }
    }

    pub fn is_player(&self, name: &str) -> bool {
        matches!(self, InventoryLocation::Player(n) if n == name)
    }
}

impl fmt::Display for InventoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryLocation::Undefined => write!(f, "undefined"),
            InventoryLocation::CurrentPlayer => write!(f, "current_player"),
            InventoryLocation::Player(name) => write!(f, "player:{name}"),
            InventoryLocation::NodeMeta(p) => write!(f, "nodemeta:{},{},{}", p.x, p.y, p.z),
            InventoryLocation::Detached(name) => write!(f, "detached:{name}"),
        }
    }
}

impl FromStr for InventoryLocation {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match s.split_once(':') {
            Some((k, r)) => (k, Some(r)),
            None => (s, None),
        };
        match (kind, rest) {
            ("undefined", _) => Ok(InventoryLocation::Undefined),
            ("current_player", _) => Ok(InventoryLocation::CurrentPlayer),
            ("player", Some(name)) => Ok(InventoryLocation::Player(name.to_string())),
            ("detached", Some(name)) => Ok(InventoryLocation::Detached(name.to_string())),
            ("nodemeta", Some(pos)) => {
                let coords: Vec<&str> = pos.split(',').collect();
                if coords.len() != 3 {
                    return Err(ProtoError::UnknownInventoryLocation(s.to_string()));
                }
                let parse = |c: &str| {
                    c.trim()
                        .parse::<i16>()
                        .map_err(|_| ProtoError::UnknownInventoryLocation(s.to_string()))
                };
                Ok(InventoryLocation::NodeMeta(V3s16::new(
                    parse(coords[0])?,
                    parse(coords[1])?,
                    parse(coords[2])?,
                )))
            }
            _ => Err(ProtoError::UnknownInventoryLocation(s.to_string())),
        }
    }
}

/// One slot reference: location, list name and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub location: InventoryLocation,
    pub list: String,
    pub index: usize,
}

/// A client inventory request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    Move {
        count: u16,
        from: SlotRef,
        to_location: InventoryLocation,
        to_list: String,
        /// `None` for "MoveSomewhere": the server picks the destination slot.
        to_index: Option<usize>,
    },
    Drop {
        count: u16,
        from: SlotRef,
    },
    Craft {
        count: u16,
        craft_location: InventoryLocation,
    },
}

impl InventoryAction {
    /// Parse the action text sent by a client.
    pub fn parse(text: &str) -> Result<Self, ProtoError> {
        let mut fields = text.split(' ').filter(|f| !f.is_empty());
        let kind = fields
            .next()
            .ok_or_else(|| ProtoError::UnknownInventoryAction(String::new()))?;

        let mut next = |what: &str| {
            fields
                .next()
                .ok_or_else(|| ProtoError::InvalidData(format!("{kind}: missing {what}")))
        };
        let number = |v: &str, what: &str| {
            v.parse::<usize>()
                .map_err(|_| ProtoError::InvalidData(format!("{kind}: bad {what} '{v}'")))
        };

        match kind {
            "Move" | "MoveSomewhere" => {
                let count = number(next("count")?, "count")?;
                let from_location = next("from_inv")?.parse()?;
                let from_list = next("from_list")?.to_string();
                let from_index = number(next("from_i")?, "from_i")?;
                let to_location = next("to_inv")?.parse()?;
                let to_list = next("to_list")?.to_string();
                let to_index = if kind == "Move" {
                    Some(number(next("to_i")?, "to_i")?)
                } else {
                    None
                };
                Ok(InventoryAction::Move {
                    count: clamp_count(count),
                    from: SlotRef {
                        location: from_location,
                        list: from_list,
                        index: from_index,
                    },
                    to_location,
                    to_list,
                    to_index,
                })
            }
            "Drop" => {
                let count = number(next("count")?, "count")?;
                let location = next("from_inv")?.parse()?;
                let list = next("from_list")?.to_string();
                let index = number(next("from_i")?, "from_i")?;
                Ok(InventoryAction::Drop {
                    count: clamp_count(count),
                    from: SlotRef {
                        location,
                        list,
                        index,
                    },
                })
            }
            "Craft" => {
                let count = number(next("count")?, "count")?;
                let craft_location = next("craft_inv")?.parse()?;
                Ok(InventoryAction::Craft {
                    count: clamp_count(count),
                    craft_location,
                })
            }
            other => Err(ProtoError::UnknownInventoryAction(other.to_string())),
        }
    }

    /// Every location this action reads or writes.
    pub fn locations_mut(&mut self) -> Vec<&mut InventoryLocation> {
        match self {
            InventoryAction::Move {
                from, to_location, ..
            } => vec![&mut from.location, to_location],
            InventoryAction::Drop { from, .. } => vec![&mut from.location],
            InventoryAction::Craft { craft_location, .. } => vec![craft_location],
        }
    }
}

fn clamp_count(count: usize) -> u16 {
    count.min(u16::MAX as usize) as u16
}

impl fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryAction::Move {
                count,
                from,
                to_location,
                to_list,
                to_index: Some(to_i),
            } => write!(
                f,
                "Move {count} {} {} {} {to_location} {to_list} {to_i}",
                from.location, from.list, from.index
            ),
            InventoryAction::Move {
                count,
                from,
                to_location,
                to_list,
                to_index: None,
            } => write!(
                f,
                "MoveSomewhere {count} {} {} {} {to_location} {to_list}",
                from.location, from.list, from.index
            ),
            InventoryAction::Drop { count, from } => write!(
                f,
                "Drop {count} {} {} {}",
                from.location, from.list, from.index
            ),
            InventoryAction::Craft {
                count,
                craft_location,
            } => write!(f, "Craft {count} {craft_location}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locations() {
        assert_eq!(
            "current_player".parse::<InventoryLocation>().unwrap(),
            InventoryLocation::CurrentPlayer
        );
        assert_eq!(
            "player:sam".parse::<InventoryLocation>().unwrap(),
            InventoryLocation::Player("sam".into())
        );
        assert_eq!(
            "nodemeta:1,-2,3".parse::<InventoryLocation>().unwrap(),
            InventoryLocation::NodeMeta(V3s16::new(1, -2, 3))
        );
        assert_eq!(
            "detached:creative_sam".parse::<InventoryLocation>().unwrap(),
            InventoryLocation::Detached("creative_sam".into())
        );
        assert!("nodemeta:1,2".parse::<InventoryLocation>().is_err());
        assert!("chest:1".parse::<InventoryLocation>().is_err());
    }

    #[test]
    fn parse_move() {
        let a = InventoryAction::parse("Move 5 current_player main 0 nodemeta:0,1,0 main 3").unwrap();
        assert_eq!(
            a,
            InventoryAction::Move {
                count: 5,
                from: SlotRef {
                    location: InventoryLocation::CurrentPlayer,
                    list: "main".into(),
                    index: 0,
                },
                to_location: InventoryLocation::NodeMeta(V3s16::new(0, 1, 0)),
                to_list: "main".into(),
                to_index: Some(3),
            }
        );
    }

    #[test]
    fn parse_move_somewhere_has_no_destination_index() {
        let a = InventoryAction::parse("MoveSomewhere 0 current_player craft 2 current_player main")
            .unwrap();
        match a {
            InventoryAction::Move { to_index, .. } => assert_eq!(to_index, None),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_drop_and_craft() {
        assert!(matches!(
            InventoryAction::parse("Drop 1 current_player main 4").unwrap(),
            InventoryAction::Drop { count: 1, .. }
        ));
        assert!(matches!(
            InventoryAction::parse("Craft 2 current_player").unwrap(),
            InventoryAction::Craft { count: 2, .. }
        ));
    }

    #[test]
    fn reject_garbage() {
        assert!(InventoryAction::parse("").is_err());
        assert!(InventoryAction::parse("Teleport 1 2 3").is_err());
        assert!(InventoryAction::parse("Move x current_player main 0 current_player main 1").is_err());
        assert!(InventoryAction::parse("Drop 1 current_player main").is_err());
    }

    #[test]
    fn display_matches_grammar() {
        let text = "Move 3 player:sam main 1 detached:trash main 0";
        assert_eq!(InventoryAction::parse(text).unwrap().to_string(), text);
        let text = "Craft 1 current_player";
        assert_eq!(InventoryAction::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn resolve_current_player() {
        let mut a = InventoryAction::parse("Move 1 current_player main 0 current_player craft 0").unwrap();
        for loc in a.locations_mut() {
            loc.resolve_current_player("sam");
        }
        for loc in a.locations_mut() {
            assert!(loc.is_player("sam"));
        }
    }
}
