//! Node definitions.

use std::collections::HashMap;

use crate::tool::ItemGroups;

pub const AIR: &str = "air";
pub const IGNORE: &str = "ignore";

/// Node names that also exist as placeable items.
pub const BUILTIN_NODE_ITEMS: &[&str] = &[
    "default:stone",
    "default:cobble",
    "default:dirt",
    "default:wood",
    "default:glass",
    "default:torch",
    "default:obsidian",
];

#[derive(Debug, Clone)]
pub struct ContentFeatures {
    pub name: String,
    pub groups: ItemGroups,
    /// Item given to the digger. Empty gives nothing.
    pub drop: String,
    pub walkable: bool,
    pub pointable: bool,
}

impl ContentFeatures {
    pub fn new(name: &str, groups: &[(&str, i32)]) -> Self {
        Self {
            name: name.to_string(),
            groups: groups.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            drop: name.to_string(),
            walkable: true,
            pointable: true,
        }
    }

    pub fn with_drop(mut self, drop: &str) -> Self {
        self.drop = drop.to_string();
        self
    }

    fn non_solid(mut self) -> Self {
        self.walkable = false;
        self.pointable = false;
        self.drop = String::new();
        self
    }
}

pub struct NodeDefManager {
    defs: HashMap<String, ContentFeatures>,
    unknown: ContentFeatures,
}

impl Default for NodeDefManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeDefManager {
    /// Registry holding only `air` and `ignore`.
    pub fn new() -> Self {
        let mut mgr = Self {
            defs: HashMap::new(),
            unknown: ContentFeatures::new("unknown", &[]).with_drop(""),
        };
        mgr.register(ContentFeatures::new(AIR, &[]).non_solid());
        mgr.register(ContentFeatures::new(IGNORE, &[]).non_solid());
        mgr
    }

    pub fn builtin() -> Self {
        let mut mgr = Self::new();
        mgr.register(ContentFeatures::new("default:stone", &[("cracky", 3)]).with_drop("default:cobble"));
        mgr.register(ContentFeatures::new("default:cobble", &[("cracky", 3)]));
        mgr.register(ContentFeatures::new("default:dirt", &[("crumbly", 3)]));
        mgr.register(ContentFeatures::new(
            "default:wood",
            &[("choppy", 2), ("oddly_breakable_by_hand", 2)],
        ));
        mgr.register(ContentFeatures::new(
            "default:glass",
            &[("cracky", 3), ("oddly_breakable_by_hand", 3)],
        ));
        mgr.register(ContentFeatures::new("default:torch", &[("dig_immediate", 3)]));
        mgr.register(ContentFeatures::new("default:obsidian", &[("cracky", 1), ("level", 2)]));
        mgr
    }

    pub fn register(&mut self, def: ContentFeatures) {
        self.defs.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> &ContentFeatures {
        self.defs.get(name).unwrap_or(&self.unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_drops_nothing() {
        let mgr = NodeDefManager::builtin();
        assert!(mgr.get(AIR).drop.is_empty());
        assert!(!mgr.get(AIR).walkable);
    }

    #[test]
    fn stone_drops_cobble() {
        let mgr = NodeDefManager::builtin();
        assert_eq!(mgr.get("default:stone").drop, "default:cobble");
        assert_eq!(mgr.get("default:dirt").drop, "default:dirt");
    }

    #[test]
    fn every_node_item_is_defined() {
        let mgr = NodeDefManager::builtin();
        for name in BUILTIN_NODE_ITEMS {
            assert_eq!(mgr.get(name).name, *name);
        }
    }

    #[test]
    fn unknown_nodes_have_no_groups() {
        let mgr = NodeDefManager::builtin();
        assert!(mgr.get("mod:missing").groups.is_empty());
    }
}
