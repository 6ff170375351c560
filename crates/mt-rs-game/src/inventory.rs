//! Item stacks, inventory lists and their text serialisation.
//!
//! Lists are addressed through [`InventoryStore`] so that moves can cross
//! player, node and detached inventories without holding two borrows at once.

use std::fmt;

use mt_rs_proto::inventory::{InventoryLocation, SlotRef};

use crate::item::ItemDefManager;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemStack {
    pub name: String,
    pub count: u16,
    /// Tool wear, out of 65535.
    pub wear: u16,
}

impl ItemStack {
    pub fn new(name: &str, count: u16) -> Self {
        if count == 0 {
            return Self::empty();
        }
        Self {
            name: name.to_string(),
            count,
            wear: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.name.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Merge `other` into this stack, returning what did not fit.
    pub fn add_item(&mut self, other: ItemStack, defs: &ItemDefManager) -> ItemStack {
        if other.is_empty() {
            return ItemStack::empty();
        }
        if self.is_empty() {
            *self = other;
            return ItemStack::empty();
        }
        if self.name != other.name || self.wear != 0 || other.wear != 0 {
            return other;
        }
        let stack_max = defs.get(&self.name).stack_max;
        let free = stack_max.saturating_sub(self.count);
        if other.count <= free {
            self.count += other.count;
            ItemStack::empty()
        } else {
            self.count = stack_max.max(self.count);
            ItemStack {
                count: other.count - free,
                ..other
            }
        }
    }

    /// Split off up to `count` items.
    pub fn take_item(&mut self, count: u16) -> ItemStack {
        if count == 0 || self.is_empty() {
            return ItemStack::empty();
        }
        let taken = count.min(self.count);
        let result = ItemStack {
            name: self.name.clone(),
            count: taken,
            wear: self.wear,
        };
        self.count -= taken;
        if self.count == 0 {
            self.clear();
        }
        result
    }

    /// Add wear; a tool reaching 65535 breaks. Returns false when it broke.
    pub fn add_wear(&mut self, amount: u16) -> bool {
        if amount == 0 || self.is_empty() {
            return true;
        }
        match self.wear.checked_add(amount) {
            Some(w) if w < u16::MAX => {
                self.wear = w;
                true
            }
            _ => {
                self.clear();
                false
            }
        }
    }
}

impl fmt::Display for ItemStack {
    /// `name`, then the count when it is not 1, then the wear when non-zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.count != 1 || self.wear != 0 {
            write!(f, " {}", self.count)?;
        }
        if self.wear != 0 {
            write!(f, " {}", self.wear)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryList {
    name: String,
    width: u32,
    items: Vec<ItemStack>,
}

impl InventoryList {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            width: 0,
            items: vec![ItemStack::empty(); size],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn items(&self) -> &[ItemStack] {
        &self.items
    }

    pub fn get(&self, i: usize) -> Option<&ItemStack> {
        self.items.get(i)
    }

    /// Replace slot `i`, returning the old stack. A slot past the end takes
    /// nothing and `item` comes back unchanged.
    pub fn change_item(&mut self, i: usize, item: ItemStack) -> ItemStack {
        match self.items.get_mut(i) {
            Some(slot) => std::mem::replace(slot, item),
            None => item,
        }
    }

    pub fn take_item(&mut self, i: usize, count: u16) -> ItemStack {
        match self.items.get_mut(i) {
            Some(slot) => slot.take_item(count),
            None => ItemStack::empty(),
        }
    }

    /// Add into slot `i`, returning the leftover.
    pub fn add_item_at(&mut self, i: usize, item: ItemStack, defs: &ItemDefManager) -> ItemStack {
        match self.items.get_mut(i) {
            Some(slot) => slot.add_item(item, defs),
            None => item,
        }
    }

    /// Add anywhere: matching stacks first, then empty slots.
    pub fn add_item(&mut self, mut item: ItemStack, defs: &ItemDefManager) -> ItemStack {
        for slot in self.items.iter_mut().filter(|s| !s.is_empty()) {
            if item.is_empty() {
                break;
            }
            item = slot.add_item(item, defs);
        }
        for slot in self.items.iter_mut().filter(|s| s.is_empty()) {
            if item.is_empty() {
                break;
            }
            item = slot.add_item(item, defs);
        }
        item
    }

    pub fn clear(&mut self) {
        self.items.iter_mut().for_each(ItemStack::clear);
    }

    fn serialize_into(&self, out: &mut String) {
        out.push_str(&format!("Width {}\n", self.width));
        for item in &self.items {
            if item.is_empty() {
                out.push_str("Empty\n");
            } else {
                out.push_str(&format!("Item {item}\n"));
            }
        }
        out.push_str("EndInventoryList\n");
    }
}

/// A named collection of lists, e.g. a player's `main` and `craft`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inventory {
    lists: Vec<InventoryList>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list, or resize an existing one keeping its contents.
    pub fn add_list(&mut self, name: &str, size: usize) -> &mut InventoryList {
        let idx = match self.lists.iter().position(|l| l.name == name) {
            Some(idx) => {
                self.lists[idx].items.resize(size, ItemStack::empty());
                idx
            }
            None => {
                self.lists.push(InventoryList::new(name, size));
                self.lists.len() - 1
            }
        };
        &mut self.lists[idx]
    }

    pub fn list(&self, name: &str) -> Option<&InventoryList> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn list_mut(&mut self, name: &str) -> Option<&mut InventoryList> {
        self.lists.iter_mut().find(|l| l.name == name)
    }

    pub fn lists(&self) -> &[InventoryList] {
        &self.lists
    }

    /// Text form sent in INVENTORY packets.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for list in &self.lists {
            out.push_str(&format!("List {} {}\n", list.name, list.len()));
            list.serialize_into(&mut out);
        }
        out.push_str("EndInventory\n");
        out
    }
}

/// Anything that can resolve an inventory location and list name.
pub trait InventoryStore {
    fn list_mut(&mut self, location: &InventoryLocation, list: &str) -> Option<&mut InventoryList>;
}

/// Move items from `from` to `(to_location, to_list)`.
///
/// `to_index = None` places the items wherever they fit. `count = 0` moves
/// the whole stack. A whole-stack move onto a slot that cannot take anything
/// swaps the two stacks. Returns the number of items moved, or `None` when a
/// list does not exist. A slot index past the end of its list moves nothing.
pub fn move_item(
    store: &mut impl InventoryStore,
    defs: &ItemDefManager,
    from: &SlotRef,
    to_location: &InventoryLocation,
    to_list: &str,
    to_index: Option<usize>,
    count: u16,
) -> Option<u16> {
    let same_list = from.location == *to_location && from.list == to_list;
    if same_list && to_index == Some(from.index) {
        return Some(count);
    }
    let dest_len = store.list_mut(to_location, to_list)?.len();
    if to_index.is_some_and(|i| i >= dest_len) {
        return Some(0);
    }

    let src = store.list_mut(&from.location, &from.list)?;
    if from.index >= src.len() {
        return Some(0);
    }
    let whole = count == 0 || src.get(from.index).is_some_and(|s| count >= s.count);
    let item = if count == 0 {
        src.change_item(from.index, ItemStack::empty())
    } else {
        src.take_item(from.index, count)
    };
    if item.is_empty() {
        return Some(0);
    }
    let old_count = item.count;

    let dest = store.list_mut(to_location, to_list)?;
    let leftover = match to_index {
        Some(i) => dest.add_item_at(i, item, defs),
        None => dest.add_item(item, defs),
    };
    let moved = old_count - leftover.count;
    if leftover.is_empty() {
        return Some(moved);
    }

    let src = store.list_mut(&from.location, &from.list)?;
    let rest = src.add_item_at(from.index, leftover, defs);
    debug_assert!(rest.is_empty());

    if moved == 0 && whole {
        if let Some(to_i) = to_index {
            let src = store.list_mut(&from.location, &from.list)?;
            let ours = src.change_item(from.index, ItemStack::empty());
            let dest = store.list_mut(to_location, to_list)?;
            let theirs = dest.change_item(to_i, ours);
            let src = store.list_mut(&from.location, &from.list)?;
            src.change_item(from.index, theirs);
        }
    }
    Some(moved)
}
