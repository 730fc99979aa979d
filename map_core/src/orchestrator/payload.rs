//! Inbound per-turn update payload.

use map_rules::{EdgeStatus, EdgeType, NodeStatus, NodeType};
use serde::{Deserialize, Serialize};

use crate::error::TurnError;

/// A place the narrative wants on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddition {
    pub place_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub status: Option<NodeStatus>,
    /// Defaults to the level just below the parent (or a location).
    #[serde(default)]
    pub node_type: Option<NodeType>,
    /// Parent ID, name or alias. Empty or the root sentinel means top-level.
    #[serde(default)]
    pub parent_node_id: Option<String>,
}

impl NodeAddition {
    pub fn new(place_name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            place_name: place_name.into(),
            description: None,
            aliases: Vec::new(),
            status: None,
            node_type: Some(node_type),
            parent_node_id: None,
        }
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent_node_id = Some(parent.into());
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Changes to an existing place. Absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    /// ID, name or alias of the node to change.
    pub place_name: String,
    #[serde(default)]
    pub new_place_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Added to the existing aliases.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub status: Option<NodeStatus>,
    #[serde(default)]
    pub node_type: Option<NodeType>,
    #[serde(default)]
    pub parent_node_id: Option<String>,
}

impl NodeUpdate {
    pub fn new(place_name: impl Into<String>) -> Self {
        Self {
            place_name: place_name.into(),
            ..Self::default()
        }
    }
}

/// An edge to add, or the new attributes of an existing one.
///
/// Endpoints are IDs, names or aliases. Edges are matched by endpoint pair
/// in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeChange {
    pub source_place_name: String,
    pub target_place_name: String,
    #[serde(default, rename = "type")]
    pub edge_type: Option<EdgeType>,
    #[serde(default)]
    pub status: Option<EdgeStatus>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EdgeChange {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_place_name: source.into(),
            target_place_name: target.into(),
            edge_type: None,
            status: None,
            description: None,
        }
    }

    pub fn with_status(mut self, status: EdgeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = Some(edge_type);
        self
    }
}

/// Everything the narrative collaborator wants changed this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MapUpdatePayload {
    #[serde(default)]
    pub nodes_to_add: Vec<NodeAddition>,
    #[serde(default)]
    pub nodes_to_update: Vec<NodeUpdate>,
    #[serde(default)]
    pub edges_to_add: Vec<EdgeChange>,
    #[serde(default)]
    pub edges_to_update: Vec<EdgeChange>,
    /// Free text or ID of where the player now is.
    #[serde(default)]
    pub suggested_current_node_identifier: Option<String>,
    /// Fallback location text, used when no suggestion is given.
    #[serde(default)]
    pub current_place_hint: Option<String>,
}

impl MapUpdatePayload {
    pub fn from_json(json: &str) -> Result<Self, TurnError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The location text to resolve, preferring the explicit suggestion.
    pub fn location_identifier(&self) -> Option<&str> {
        [&self.suggested_current_node_identifier, &self.current_place_hint]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// Reject payloads that are inconsistent before touching the map.
    pub fn validate(&self) -> Result<(), TurnError> {
        if let Some(node) = self.nodes_to_add.iter().find(|n| n.place_name.trim().is_empty()) {
            return Err(TurnError::MalformedPayload(format!(
                "node to add has no place name (parent {:?})",
                node.parent_node_id
            )));
        }
        if self.nodes_to_update.iter().any(|n| n.place_name.trim().is_empty()) {
            return Err(TurnError::MalformedPayload(
                "node to update has no identifier".to_string(),
            ));
        }
        if self
            .nodes_to_update
            .iter()
            .any(|n| n.new_place_name.as_deref().is_some_and(|s| s.trim().is_empty()))
        {
            return Err(TurnError::MalformedPayload(
                "new place name is empty".to_string(),
            ));
        }
        for edge in self.edges_to_add.iter().chain(&self.edges_to_update) {
            if edge.source_place_name.trim().is_empty() || edge.target_place_name.trim().is_empty() {
                return Err(TurnError::InvalidEdge {
                    source_ref: edge.source_place_name.clone(),
                    target_ref: edge.target_place_name.clone(),
                    reason: "missing endpoint".to_string(),
                });
            }
        }
        Ok(())
    }
}
