//! Map node definitions.

use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::mechanics::NodeType;

/// Discovery status of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Undiscovered,
    Discovered,
    Rumored,
    QuestTarget,
    Blocked,
}

impl NodeStatus {
    /// Whether the player knows of the place only by hearsay (or not at all).
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, NodeStatus::Undiscovered | NodeStatus::Rumored)
    }
}

/// A point on the map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A discoverable place in the game world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    pub id: NodeId,
    pub place_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub visited: bool,
    pub node_type: NodeType,
    /// `None` or the root sentinel means top-level.
    #[serde(default)]
    pub parent_node_id: Option<NodeId>,
    #[serde(default)]
    pub position: Point,
    #[serde(default)]
    pub visual_radius: f64,
}

impl MapNode {
    /// Create a new node with a freshly generated ID.
    pub fn new(place_name: impl Into<String>, node_type: NodeType) -> Self {
        let place_name = place_name.into();
        Self::with_id(NodeId::generate(&place_name), place_name, node_type)
    }

    /// Create a node with a caller-chosen ID.
    pub fn with_id(id: NodeId, place_name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id,
            place_name: place_name.into(),
            aliases: Vec::new(),
            description: String::new(),
            status: NodeStatus::Undiscovered,
            visited: false,
            node_type,
            parent_node_id: None,
            position: Point::ORIGIN,
            visual_radius: 0.0,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_node_id = Some(parent);
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The parent ID, ignoring the root sentinel.
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent_node_id.as_ref().filter(|p| !p.is_root())
    }

    pub fn level(&self) -> u8 {
        self.node_type.level()
    }

    /// Mark the node visited, escalating an unconfirmed status to discovered.
    ///
    /// Returns `true` if anything changed.
    pub fn mark_visited(&mut self) -> bool {
        let mut changed = !self.visited;
        self.visited = true;
        if self.status.is_unconfirmed() {
            self.status = NodeStatus::Discovered;
            changed = true;
        }
        changed
    }

    /// Add an alias unless the node already answers to that name.
    pub fn add_alias(&mut self, alias: &str) {
        let alias = alias.trim();
        if alias.is_empty() || self.place_name.eq_ignore_ascii_case(alias) {
            return;
        }
        if !self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
            self.aliases.push(alias.to_string());
        }
    }
}
