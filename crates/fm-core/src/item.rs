//! Consumable items usable during combat.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an item does when consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// Restores resource pools.
    Potion {
        /// Health restored.
        health: i32,
        /// Magicka restored.
        magicka: i32,
        /// Stamina restored.
        stamina: i32,
    },
    /// Heals a little and eases hunger and thirst.
    Food {
        /// Health restored.
        heal: i32,
        /// Hunger relieved.
        hunger: f64,
        /// Thirst relieved.
        thirst: f64,
    },
    /// Anything else; unusable in combat.
    Other,
}

/// An item the player can consume mid-fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatItem {
    /// Stable string id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What consuming it does.
    pub kind: ItemKind,
}

impl CombatItem {
    /// Create a potion.
    pub fn potion(
        id: impl Into<String>,
        name: impl Into<String>,
        health: i32,
        magicka: i32,
        stamina: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Potion {
                health,
                magicka,
                stamina,
            },
        }
    }

    /// Create a food item.
    pub fn food(
        id: impl Into<String>,
        name: impl Into<String>,
        heal: i32,
        hunger: f64,
        thirst: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Food {
                heal,
                hunger,
                thirst,
            },
        }
    }

    /// Create an item with no combat use.
    pub fn other(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Other,
        }
    }

    /// Returns true if consuming this in combat does anything.
    pub fn usable_in_combat(&self) -> bool {
        !matches!(self.kind, ItemKind::Other)
    }
}

impl fmt::Display for CombatItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A stack of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// The stacked item.
    pub item: CombatItem,
    /// How many are left.
    pub count: u32,
}

/// The slice of the player's inventory that matters to combat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add items, stacking onto an existing entry by id.
    pub fn add(&mut self, item: CombatItem, count: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item.id == item.id) {
            entry.count += count;
        } else {
            self.entries.push(InventoryEntry { item, count });
        }
    }

    /// Look up an item with at least one left.
    pub fn get(&self, id: &str) -> Option<&CombatItem> {
        self.entries
            .iter()
            .find(|e| e.item.id == id && e.count > 0)
            .map(|e| &e.item)
    }

    /// How many of an item remain.
    pub fn count(&self, id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.item.id == id)
            .map_or(0, |e| e.count)
    }

    /// Consume one of an item, returning it. Empty stacks are removed.
    pub fn consume(&mut self, id: &str) -> Option<CombatItem> {
        let index = self
            .entries
            .iter()
            .position(|e| e.item.id == id && e.count > 0)?;
        self.entries[index].count -= 1;
        let item = self.entries[index].item.clone();
        if self.entries[index].count == 0 {
            self.entries.remove(index);
        }
        Some(item)
    }

    /// All stacks.
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    /// Returns true when nothing is carried.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
