//! Map edge definitions.

use serde::{Deserialize, Serialize};

use super::{EdgeId, NodeId};

/// Status of a path between two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    #[default]
    Open,
    Rumored,
    Removed,
}

impl EdgeStatus {
    /// Whether the edge counts as a confirmed connection.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, EdgeStatus::Open)
    }
}

/// Kind of path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Path,
    Road,
    SeaRoute,
    Door,
    Teleporter,
    SecretPassage,
    RiverCrossing,
    Temporary,
    Boarding,
}

/// A path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEdge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub status: EdgeStatus,
    #[serde(default, rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub description: String,
}

impl MapEdge {
    /// Create a new open path between two nodes.
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source_node_id: source,
            target_node_id: target,
            status: EdgeStatus::Open,
            edge_type: EdgeType::Path,
            description: String::new(),
        }
    }

    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: EdgeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = edge_type;
        self
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source_node_id == node || &self.target_node_id == node
    }

    /// Whether this edge joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &NodeId, b: &NodeId) -> bool {
        (&self.source_node_id == a && &self.target_node_id == b)
            || (&self.source_node_id == b && &self.target_node_id == a)
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source_node_id == node {
            Some(&self.target_node_id)
        } else if &self.target_node_id == node {
            Some(&self.source_node_id)
        } else {
            None
        }
    }
}
