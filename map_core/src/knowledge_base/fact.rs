//! Fact definitions - lore entries that mention world entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactId(pub Uuid);

impl FactId {
    /// Create a new random fact ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A piece of lore the player has learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub id: FactId,

    /// Human-readable content of the fact.
    pub content: String,

    /// IDs of the nodes, items or characters this fact is about.
    pub entity_ids: Vec<String>,
}

impl Fact {
    /// Create a new fact with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: FactId::new(),
            content: content.into(),
            entity_ids: Vec::new(),
        }
    }

    /// Link this fact to an entity.
    pub fn about(mut self, entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        if !self.entity_ids.contains(&entity_id) {
            self.entity_ids.push(entity_id);
        }
        self
    }

    /// Check if this fact involves a specific entity.
    pub fn involves(&self, entity_id: &str) -> bool {
        self.entity_ids.iter().any(|e| e == entity_id)
    }
}
