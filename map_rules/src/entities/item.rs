//! Inventory items. The map only cares about where an item is held.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NodeId;
use crate::world_state::NodeReferences;

/// Holder ID used for items carried by the player.
pub const PLAYER_HOLDER_ID: &str = "player";

/// Unique identifier for items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// An item somewhere in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// The player, an NPC, or a map node ID.
    pub holder_id: String,
}

impl Item {
    pub fn new(name: impl Into<String>, holder_id: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            holder_id: holder_id.into(),
        }
    }

    pub fn is_carried(&self) -> bool {
        self.holder_id == PLAYER_HOLDER_ID
    }
}

/// Every item the game tracks, wherever it is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Inventory {
    pub items: Vec<Item>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Items held by a player, NPC or node.
    pub fn held_by(&self, holder_id: &str) -> Vec<&Item> {
        self.items.iter().filter(|i| i.holder_id == holder_id).collect()
    }
}

impl NodeReferences for Inventory {
    fn rewrite_node_id(&mut self, old: &NodeId, new: &NodeId) -> usize {
        let mut count = 0;
        for item in self.items.iter_mut().filter(|i| i.holder_id == old.as_str()) {
            item.holder_id = new.as_str().to_string();
            count += 1;
        }
        count
    }

    fn references_node(&self, id: &NodeId) -> bool {
        self.items.iter().any(|i| i.holder_id == id.as_str())
    }
}
