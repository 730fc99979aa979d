//! Entity definitions for the world map.

mod edge;
mod item;
mod node;

pub use edge::*;
pub use item::*;
pub use node::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved ID of the synthetic root every top-level node hangs from.
pub const ROOT_NODE_ID: &str = "universe";

const NODE_ID_PREFIX: &str = "node_";
const SUFFIX_LEN: usize = 4;

/// Unique identifier for map nodes.
///
/// IDs are derived from the display name plus a short random suffix,
/// e.g. `node_yellow_door_3fa9`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a fresh ID for a place name.
    pub fn generate(place_name: &str) -> Self {
        Self::derive(place_name, &random_suffix())
    }

    /// Build the ID for a place name with a known suffix.
    ///
    /// Deriving twice from the same inputs yields the same ID.
    pub fn derive(place_name: &str, suffix: &str) -> Self {
        Self(format!("{}{}_{}", NODE_ID_PREFIX, slugify(place_name), suffix))
    }

    /// The reserved root sentinel.
    pub fn root() -> Self {
        Self(ROOT_NODE_ID.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NODE_ID
    }

    /// The disambiguating suffix, if this ID follows the generated format.
    pub fn suffix(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(NODE_ID_PREFIX)?;
        let (_, suffix) = rest.rsplit_once('_')?;
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for map edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create a new random edge ID.
    pub fn new() -> Self {
        Self(format!("edge_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lower-case a place name, collapsing every run of other characters to `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("unnamed");
    }
    slug
}

/// A fresh disambiguating suffix for node IDs.
pub fn random_suffix() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..SUFFIX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Yellow Door"), "yellow_door");
        assert_eq!(slugify("  The Rim -- North  "), "the_rim_north");
        assert_eq!(slugify("???"), "unnamed");
    }

    #[test]
    fn test_derive_is_idempotent() {
        let a = NodeId::derive("Old Mill", "ab12");
        let b = NodeId::derive("Old Mill", "ab12");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "node_old_mill_ab12");
        assert_eq!(a.suffix(), Some("ab12"));
    }

    #[test]
    fn test_generated_id_format() {
        let id = NodeId::generate("Harbor");
        assert!(id.as_str().starts_with("node_harbor_"));
        assert_eq!(id.suffix().map(str::len), Some(SUFFIX_LEN));
    }

    #[test]
    fn test_suffix_of_foreign_id() {
        assert_eq!(NodeId::root().suffix(), None);
        assert_eq!(NodeId::from("legacy-id").suffix(), None);
    }
}
