//! World state management - the map graph and everything that points into it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::entities::{EdgeId, Inventory, MapEdge, MapNode, NodeId};

/// Structural errors raised by [`MapData`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapDataError {
    #[error("unknown node `{0}`")]
    UnknownNode(NodeId),

    #[error("edge would connect `{0}` to itself")]
    SelfLoop(NodeId),

    #[error("making `{parent}` the parent of `{child}` would create a cycle")]
    ParentCycle { child: NodeId, parent: NodeId },

    #[error("node id `{0}` is already taken")]
    IdTaken(NodeId),
}

/// Anything that can hold references to map node IDs.
///
/// Renaming a node rewrites every implementor in one pass.
pub trait NodeReferences {
    /// Replace every reference to `old` with `new`, returning how many changed.
    fn rewrite_node_id(&mut self, old: &NodeId, new: &NodeId) -> usize;

    /// Whether any reference to `id` remains.
    fn references_node(&self, id: &NodeId) -> bool;
}

/// Canonical persisted/rendered shape of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MapSnapshot {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

/// The map graph: an arena of nodes and edges keyed by ID.
///
/// Parent/child links are ID references resolved on demand. Iteration is in
/// ID order so every derived computation is deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "MapSnapshot", into = "MapSnapshot")]
pub struct MapData {
    nodes: BTreeMap<NodeId, MapNode>,
    edges: BTreeMap<EdgeId, MapEdge>,
}

impl From<MapSnapshot> for MapData {
    fn from(snapshot: MapSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

impl From<MapData> for MapSnapshot {
    fn from(map: MapData) -> Self {
        MapSnapshot {
            nodes: map.nodes.into_values().collect(),
            edges: map.edges.into_values().collect(),
        }
    }
}

impl MapData {
    /// Create a new empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. Later entries win on duplicate IDs.
    pub fn from_snapshot(snapshot: MapSnapshot) -> Self {
        let mut map = Self::new();
        for node in snapshot.nodes {
            map.nodes.insert(node.id.clone(), node);
        }
        for edge in snapshot.edges {
            map.edges.insert(edge.id.clone(), edge);
        }
        map
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.clone().into()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<MapSnapshot>(json).map(Self::from_snapshot)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MapNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &MapEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&MapNode> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut MapNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert or replace a node.
    pub fn insert_node(&mut self, node: MapNode) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Move a node to a new key. References elsewhere are not touched.
    pub fn rekey_node(&mut self, old: &NodeId, new: NodeId) -> Result<(), MapDataError> {
        if self.nodes.contains_key(&new) {
            return Err(MapDataError::IdTaken(new));
        }
        let mut node = self
            .nodes
            .remove(old)
            .ok_or_else(|| MapDataError::UnknownNode(old.clone()))?;
        node.id = new.clone();
        self.nodes.insert(new, node);
        Ok(())
    }

    /// Add an edge between two existing, distinct nodes.
    pub fn add_edge(&mut self, edge: MapEdge) -> Result<EdgeId, MapDataError> {
        for end in [&edge.source_node_id, &edge.target_node_id] {
            if !self.nodes.contains_key(end) {
                return Err(MapDataError::UnknownNode(end.clone()));
            }
        }
        if edge.source_node_id == edge.target_node_id {
            return Err(MapDataError::SelfLoop(edge.source_node_id));
        }
        let id = edge.id.clone();
        self.edges.insert(id.clone(), edge);
        Ok(id)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&MapEdge> {
        self.edges.get(id)
    }

    pub fn get_edge_mut(&mut self, id: &EdgeId) -> Option<&mut MapEdge> {
        self.edges.get_mut(id)
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<MapEdge> {
        self.edges.remove(id)
    }

    /// First edge (by ID) joining `a` and `b` in either direction.
    pub fn find_edge_between(&self, a: &NodeId, b: &NodeId) -> Option<&MapEdge> {
        self.edges.values().find(|e| e.connects(a, b))
    }

    /// Direct children of a node, in ID order.
    pub fn children_of(&self, id: &NodeId) -> Vec<&MapNode> {
        self.nodes
            .values()
            .filter(|n| n.parent() == Some(id))
            .collect()
    }

    /// The parent node, if it exists in the map.
    pub fn parent_of(&self, id: &NodeId) -> Option<&MapNode> {
        self.nodes
            .get(id)
            .and_then(|n| n.parent())
            .and_then(|p| self.nodes.get(p))
    }

    /// Existing ancestors from nearest to farthest. Stops on a cycle.
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<&NodeId> = HashSet::from([id]);
        let mut cursor = self.parent_of(id);
        while let Some(parent) = cursor {
            if !seen.insert(&parent.id) {
                break;
            }
            out.push(parent.id.clone());
            cursor = self.parent_of(&parent.id);
        }
        out
    }

    /// Change a node's parent. `None` (or the root sentinel) makes it top-level.
    pub fn set_parent(&mut self, child: &NodeId, parent: Option<NodeId>) -> Result<(), MapDataError> {
        if !self.nodes.contains_key(child) {
            return Err(MapDataError::UnknownNode(child.clone()));
        }
        let parent = parent.filter(|p| !p.is_root());
        if let Some(p) = &parent {
            if !self.nodes.contains_key(p) {
                return Err(MapDataError::UnknownNode(p.clone()));
            }
            if p == child || self.ancestors(p).contains(child) {
                return Err(MapDataError::ParentCycle {
                    child: child.clone(),
                    parent: p.clone(),
                });
            }
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent_node_id = parent;
        }
        Ok(())
    }
}

impl NodeReferences for MapData {
    fn rewrite_node_id(&mut self, old: &NodeId, new: &NodeId) -> usize {
        let mut count = 0;
        for node in self.nodes.values_mut() {
            if node.parent_node_id.as_ref() == Some(old) {
                node.parent_node_id = Some(new.clone());
                count += 1;
            }
        }
        for edge in self.edges.values_mut() {
            if &edge.source_node_id == old {
                edge.source_node_id = new.clone();
                count += 1;
            }
            if &edge.target_node_id == old {
                edge.target_node_id = new.clone();
                count += 1;
            }
        }
        count
    }

    fn references_node(&self, id: &NodeId) -> bool {
        self.nodes.values().any(|n| n.parent_node_id.as_ref() == Some(id))
            || self.edges.values().any(|e| e.touches(id))
    }
}

/// Where the player is and where they are headed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocationPointers {
    pub current_node_id: Option<NodeId>,
    pub destination_node_id: Option<NodeId>,
}

impl NodeReferences for LocationPointers {
    fn rewrite_node_id(&mut self, old: &NodeId, new: &NodeId) -> usize {
        let mut count = 0;
        for pointer in [&mut self.current_node_id, &mut self.destination_node_id] {
            if pointer.as_ref() == Some(old) {
                *pointer = Some(new.clone());
                count += 1;
            }
        }
        count
    }

    fn references_node(&self, id: &NodeId) -> bool {
        self.current_node_id.as_ref() == Some(id) || self.destination_node_id.as_ref() == Some(id)
    }
}

/// The complete map-related state of the game between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub map: MapData,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub pointers: LocationPointers,
    /// Number of completed turns.
    #[serde(default)]
    pub turn: u32,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(map: MapData) -> Self {
        Self {
            map,
            ..Self::default()
        }
    }

    pub fn current_node(&self) -> Option<&MapNode> {
        self.pointers
            .current_node_id
            .as_ref()
            .and_then(|id| self.map.get_node(id))
    }

    /// Every reference-bearing collection owned by the world state.
    pub fn reference_holders_mut(&mut self) -> [&mut dyn NodeReferences; 3] {
        [&mut self.map, &mut self.inventory, &mut self.pointers]
    }

    pub fn reference_holders(&self) -> [&dyn NodeReferences; 3] {
        [&self.map, &self.inventory, &self.pointers]
    }
}
