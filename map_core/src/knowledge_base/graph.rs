//! Lore book - facts plus a reverse index from entities to facts.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{Fact, FactId};
use map_rules::{NodeId, NodeReferences};

/// Every fact the game knows, indexed by the entities they mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoreBook {
    /// All facts stored by ID.
    facts: HashMap<FactId, Fact>,

    /// Reverse index: entity ID -> facts mentioning it.
    fact_by_entity: HashMap<String, HashSet<FactId>>,
}

impl LoreBook {
    /// Create a new empty lore book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new fact.
    ///
    /// Returns the fact ID for reference.
    pub fn add_fact(&mut self, fact: Fact) -> FactId {
        let id = fact.id;
        for entity in &fact.entity_ids {
            self.fact_by_entity
                .entry(entity.clone())
                .or_default()
                .insert(id);
        }
        self.facts.insert(id, fact);
        id
    }

    /// Remove a fact from the lore book.
    pub fn remove_fact(&mut self, id: FactId) -> Option<Fact> {
        let fact = self.facts.remove(&id)?;
        for entity in &fact.entity_ids {
            if let Some(ids) = self.fact_by_entity.get_mut(entity) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.fact_by_entity.remove(entity);
                }
            }
        }
        Some(fact)
    }

    /// Get fact by ID.
    pub fn get_fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    /// Get all facts mentioning an entity.
    pub fn facts_about(&self, entity_id: &str) -> Vec<&Fact> {
        self.fact_by_entity
            .get(entity_id)
            .map(|ids| ids.iter().filter_map(|id| self.facts.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all facts in the lore book.
    pub fn all_facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    /// Get the total number of facts.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }
}

impl NodeReferences for LoreBook {
    // Only the facts the index lists for `old` are visited.
    fn rewrite_node_id(&mut self, old: &NodeId, new: &NodeId) -> usize {
        let Some(ids) = self.fact_by_entity.remove(old.as_str()) else {
            return 0;
        };

        let mut count = 0;
        for id in &ids {
            if let Some(fact) = self.facts.get_mut(id) {
                for entity in fact.entity_ids.iter_mut().filter(|e| e.as_str() == old.as_str()) {
                    *entity = new.as_str().to_string();
                    count += 1;
                }
                let mut seen = HashSet::new();
                fact.entity_ids.retain(|e| seen.insert(e.clone()));
            }
        }

        self.fact_by_entity
            .entry(new.as_str().to_string())
            .or_default()
            .extend(ids);
        count
    }

    fn references_node(&self, id: &NodeId) -> bool {
        self.fact_by_entity.contains_key(id.as_str())
            || self.facts.values().any(|f| f.involves(id.as_str()))
    }
}
