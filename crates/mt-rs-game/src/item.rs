//! Item definitions and the item registry.

use std::collections::HashMap;

use crate::tool::{ItemGroups, ToolCapabilities, ToolGroupCap};

/// Name of the bare hand item.
pub const HAND_ITEM: &str = "";

/// Pointing range of items that do not set one, in nodes.
pub const DEFAULT_RANGE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    None,
    Node,
    Craft,
    Tool,
}

#[derive(Debug, Clone)]
pub struct ItemDefinition {
    pub name: String,
    pub description: String,
    pub item_type: ItemType,
    pub stack_max: u16,
    /// Pointing range in nodes. Negative falls back to the hand's range.
    pub range: f32,
    pub groups: ItemGroups,
    pub tool_capabilities: Option<ToolCapabilities>,
}

impl ItemDefinition {
    pub fn new(name: &str, item_type: ItemType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            item_type,
            stack_max: if item_type == ItemType::Tool { 1 } else { 99 },
            range: DEFAULT_RANGE,
            groups: ItemGroups::new(),
            tool_capabilities: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_tool_capabilities(mut self, caps: ToolCapabilities) -> Self {
        self.tool_capabilities = Some(caps);
        self
    }

    /// Whether using this item places a node of the same name.
    pub fn places_node(&self) -> bool {
        self.item_type == ItemType::Node
    }
}

/// Registry of every known item.
pub struct ItemDefManager {
    defs: HashMap<String, ItemDefinition>,
    unknown: ItemDefinition,
}

impl Default for ItemDefManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemDefManager {
    /// Empty registry holding only the hand.
    pub fn new() -> Self {
        let mut mgr = Self {
            defs: HashMap::new(),
            unknown: ItemDefinition::new("unknown", ItemType::None),
        };
        mgr.register(hand_definition());
        mgr
    }

    /// Registry with the default hand, tools and node items.
    pub fn builtin() -> Self {
        let mut mgr = Self::new();
        register_tools(&mut mgr);
        for name in crate::node::BUILTIN_NODE_ITEMS {
            mgr.register(ItemDefinition::new(name, ItemType::Node));
        }
        mgr.register(
            ItemDefinition::new("default:stick", ItemType::Craft).with_description("Stick"),
        );
        mgr
    }

    pub fn register(&mut self, def: ItemDefinition) {
        self.defs.insert(def.name.clone(), def);
    }

    /// Definition for `name`; unknown names get a placeholder definition.
    pub fn get(&self, name: &str) -> &ItemDefinition {
        self.defs.get(name).unwrap_or(&self.unknown)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn hand(&self) -> &ItemDefinition {
        self.get(HAND_ITEM)
    }

    /// Tool capabilities of `name`, falling back to the hand's.
    pub fn tool_capabilities(&self, name: &str) -> ToolCapabilities {
        self.get(name)
            .tool_capabilities
            .clone()
            .or_else(|| self.hand().tool_capabilities.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn hand_definition() -> ItemDefinition {
    ItemDefinition::new(HAND_ITEM, ItemType::None)
        .with_range(DEFAULT_RANGE)
        .with_tool_capabilities(
            ToolCapabilities {
                full_punch_interval: 0.9,
                max_drop_level: 0,
                ..Default::default()
            }
            .with_groupcap("crumbly", ToolGroupCap::new(&[(2, 3.0), (3, 0.7)], 0, 1))
            .with_groupcap("snappy", ToolGroupCap::new(&[(3, 0.4)], 0, 1))
            .with_groupcap(
                "oddly_breakable_by_hand",
                ToolGroupCap::new(&[(1, 3.5), (2, 2.0), (3, 0.7)], 0, 3),
            ),
        )
}

fn register_tools(mgr: &mut ItemDefManager) {
    mgr.register(
        ItemDefinition::new("default:pick_wood", ItemType::Tool)
            .with_description("Wooden Pickaxe")
            .with_tool_capabilities(ToolCapabilities::default().with_groupcap(
                "cracky",
                ToolGroupCap::new(&[(3, 1.6)], 10, 1),
            )),
    );
    mgr.register(
        ItemDefinition::new("default:pick_steel", ItemType::Tool)
            .with_description("Steel Pickaxe")
            .with_tool_capabilities(ToolCapabilities::default().with_groupcap(
                "cracky",
                ToolGroupCap::new(&[(1, 4.0), (2, 1.6), (3, 0.8)], 20, 2),
            )),
    );
    mgr.register(
        ItemDefinition::new("default:shovel_steel", ItemType::Tool)
            .with_description("Steel Shovel")
            .with_tool_capabilities(ToolCapabilities::default().with_groupcap(
                "crumbly",
                ToolGroupCap::new(&[(1, 1.5), (2, 0.9), (3, 0.4)], 30, 2),
            )),
    );
    mgr.register(
        ItemDefinition::new("default:axe_steel", ItemType::Tool)
            .with_description("Steel Axe")
            .with_tool_capabilities(ToolCapabilities::default().with_groupcap(
                "choppy",
                ToolGroupCap::new(&[(1, 2.5), (2, 1.4), (3, 1.0)], 20, 2),
            )),
    );
    // Long reach, used for remote building.
    mgr.register(
        ItemDefinition::new("default:builder_wand", ItemType::Tool)
            .with_description("Builder's Wand")
            .with_range(10.0),
    );
}
