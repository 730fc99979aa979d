//! Hierarchy levels: which kinds of place may contain which.

use serde::{Deserialize, Serialize};

/// Level number of the most concrete node type.
pub const FEATURE_LEVEL: u8 = 5;

/// Kind of place, ordered from broadest to most concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Broad areas
    Region,
    Location,

    // Built-up areas
    Settlement,
    District,

    // Structures
    Exterior,
    Interior,

    // Concrete spots
    Room,
    Feature,
}

impl NodeType {
    /// Hierarchy level; a parent must always have a strictly lower level.
    pub fn level(&self) -> u8 {
        match self {
            NodeType::Region => 0,
            NodeType::Location => 1,
            NodeType::Settlement | NodeType::District => 2,
            NodeType::Exterior | NodeType::Interior => 3,
            NodeType::Room => 4,
            NodeType::Feature => FEATURE_LEVEL,
        }
    }

    /// Canonical type for a level. Levels past feature clamp to feature.
    pub fn for_level(level: u8) -> NodeType {
        match level {
            0 => NodeType::Region,
            1 => NodeType::Location,
            2 => NodeType::Settlement,
            3 => NodeType::Exterior,
            4 => NodeType::Room,
            _ => NodeType::Feature,
        }
    }

    /// The next broader level's canonical type, `None` for a region.
    pub fn promoted(&self) -> Option<NodeType> {
        self.level().checked_sub(1).map(NodeType::for_level)
    }

    /// The next more concrete level's canonical type, `None` for a feature.
    pub fn demoted(&self) -> Option<NodeType> {
        let level = self.level();
        if level >= FEATURE_LEVEL {
            None
        } else {
            Some(NodeType::for_level(level + 1))
        }
    }

    /// Whether a node of this type may contain a node of type `child`.
    pub fn can_contain(&self, child: NodeType) -> bool {
        self.level() < child.level()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Region => "region",
            NodeType::Location => "location",
            NodeType::Settlement => "settlement",
            NodeType::District => "district",
            NodeType::Exterior => "exterior",
            NodeType::Interior => "interior",
            NodeType::Room => "room",
            NodeType::Feature => "feature",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
