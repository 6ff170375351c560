//! Shapeless crafting.

use tracing::debug;

use crate::inventory::{Inventory, ItemStack};
use crate::item::ItemDefManager;

pub const CRAFT_LIST: &str = "craft";
pub const CRAFT_PREVIEW_LIST: &str = "craftpreview";
pub const CRAFT_RESULT_LIST: &str = "craftresult";

/// A shapeless recipe: one of each input, in any slot.
#[derive(Debug, Clone)]
pub struct CraftRecipe {
    pub output: ItemStack,
    /// Input item names, sorted.
    inputs: Vec<String>,
}

impl CraftRecipe {
    pub fn shapeless(output: ItemStack, inputs: &[&str]) -> Self {
        let mut inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        inputs.sort();
        Self { output, inputs }
    }

    fn matches(&self, grid: &[ItemStack]) -> bool {
        let mut names: Vec<&str> = grid
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.name.as_str())
            .collect();
        names.sort_unstable();
        names.len() == self.inputs.len() && names.iter().zip(&self.inputs).all(|(a, b)| *a == b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CraftRegistry {
    recipes: Vec<CraftRecipe>,
}

impl CraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(CraftRecipe::shapeless(
            ItemStack::new("default:stick", 4),
            &["default:wood"],
        ));
        reg.register(CraftRecipe::shapeless(
            ItemStack::new("default:torch", 4),
            &["default:stick", "default:cobble"],
        ));
        reg.register(CraftRecipe::shapeless(
            ItemStack::new("default:pick_wood", 1),
            &["default:stick", "default:wood", "default:wood", "default:wood"],
        ));
        reg
    }

    pub fn register(&mut self, recipe: CraftRecipe) {
        self.recipes.push(recipe);
    }

    pub fn find(&self, grid: &[ItemStack]) -> Option<&CraftRecipe> {
        self.recipes.iter().find(|r| r.matches(grid))
    }

    /// Craft up to `count` times (at least once) from the `craft` grid of
    /// `inv` into `craftresult`. Returns how many crafts happened.
    pub fn craft(&self, inv: &mut Inventory, count: u16, defs: &ItemDefManager) -> u16 {
        let mut crafted = 0;
        for _ in 0..count.max(1) {
            let Some(grid) = inv.list(CRAFT_LIST).map(|l| l.items().to_vec()) else {
                break;
            };
            let Some(recipe) = self.find(&grid) else {
                break;
            };
            let Some(result) = inv.list_mut(CRAFT_RESULT_LIST) else {
                break;
            };
            let mut trial = result.clone();
            if !trial.add_item(recipe.output.clone(), defs).is_empty() {
                debug!("craft result list is full");
                break;
            }
            *result = trial;
            if let Some(grid) = inv.list_mut(CRAFT_LIST) {
                for i in 0..grid.len() {
                    grid.take_item(i, 1);
                }
            }
            crafted += 1;
        }
        self.update_preview(inv);
        crafted
    }

    /// Show what the current grid would produce.
    pub fn update_preview(&self, inv: &mut Inventory) {
        let output = inv
            .list(CRAFT_LIST)
            .and_then(|l| self.find(l.items()))
            .map(|r| r.output.clone())
            .unwrap_or_default();
        if let Some(preview) = inv.list_mut(CRAFT_PREVIEW_LIST) {
            preview.change_item(0, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crafting_inventory(grid: &[(usize, &str, u16)]) -> Inventory {
        let mut inv = Inventory::new();
        let craft = inv.add_list(CRAFT_LIST, 9);
        for (i, name, count) in grid {
            craft.change_item(*i, ItemStack::new(name, *count));
        }
        inv.add_list(CRAFT_PREVIEW_LIST, 1);
        inv.add_list(CRAFT_RESULT_LIST, 1);
        inv
    }

    #[test]
    fn shapeless_ignores_slot_order() {
        let reg = CraftRegistry::builtin();
        let a = [ItemStack::new("default:cobble", 1), ItemStack::new("default:stick", 1)];
        let b = [ItemStack::empty(), ItemStack::new("default:stick", 1), ItemStack::new("default:cobble", 1)];
        assert!(reg.find(&a).is_some());
        assert!(reg.find(&b).is_some());
        assert!(reg.find(&[ItemStack::new("default:stick", 1)]).is_none());
    }

    #[test]
    fn craft_consumes_one_per_slot() {
        let reg = CraftRegistry::builtin();
        let defs = ItemDefManager::builtin();
        let mut inv = crafting_inventory(&[(4, "default:wood", 3)]);
        assert_eq!(reg.craft(&mut inv, 2, &defs), 2);
        assert_eq!(inv.list(CRAFT_LIST).unwrap().get(4).unwrap().count, 1);
        assert_eq!(
            inv.list(CRAFT_RESULT_LIST).unwrap().get(0).unwrap(),
            &ItemStack::new("default:stick", 8)
        );
        assert_eq!(
            inv.list(CRAFT_PREVIEW_LIST).unwrap().get(0).unwrap(),
            &ItemStack::new("default:stick", 4)
        );
    }

    #[test]
    fn craft_stops_when_grid_runs_out() {
        let reg = CraftRegistry::builtin();
        let defs = ItemDefManager::builtin();
        let mut inv = crafting_inventory(&[(0, "default:wood", 1)]);
        assert_eq!(reg.craft(&mut inv, 5, &defs), 1);
        assert!(inv.list(CRAFT_PREVIEW_LIST).unwrap().get(0).unwrap().is_empty());
    }

    #[test]
    fn craft_refuses_when_result_differs() {
        let reg = CraftRegistry::builtin();
        let defs = ItemDefManager::builtin();
        let mut inv = crafting_inventory(&[(0, "default:wood", 1)]);
        inv.list_mut(CRAFT_RESULT_LIST)
            .unwrap()
            .change_item(0, ItemStack::new("default:dirt", 1));
        assert_eq!(reg.craft(&mut inv, 1, &defs), 0);
        assert_eq!(inv.list(CRAFT_LIST).unwrap().get(0).unwrap().count, 1);
    }
}
