//! Gameplay data model: lag pools, tools, item and node definitions,
//! inventories, crafting and the per-player anti-cheat state.

pub mod craft;
pub mod inventory;
pub mod item;
pub mod lag_pool;
pub mod node;
pub mod player;
pub mod tool;

pub use craft::{CraftRecipe, CraftRegistry};
pub use inventory::{Inventory, InventoryList, InventoryStore, ItemStack};
pub use item::{ItemDefManager, ItemDefinition, ItemType};
pub use lag_pool::{LagPool, MaxLagEstimate, LAG_POOL_MIN};
pub use node::{ContentFeatures, NodeDefManager};
pub use player::{DigIntent, MovementSettings, PlayerState};
pub use tool::{get_dig_params, DigParams, ItemGroups, ToolCapabilities, ToolGroupCap};
