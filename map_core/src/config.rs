//! Host-supplied tunables.

use map_rules::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Limits for the hierarchy repair loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Repair passes allowed before the turn is failed.
    pub max_passes: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self { max_passes: 64 }
    }
}

/// Limits for redundant-edge detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Longest alternate path (in hops) the search will look for.
    pub max_search_depth: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            max_search_depth: 32,
        }
    }
}

/// All map tunables. Every section and field is optional in TOML.
///
/// ```toml
/// [layout]
/// base_radius = 12.0
/// padding = 5.0
///
/// [curation]
/// max_search_depth = 16
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MapConfig {
    pub layout: LayoutConfig,
    pub hierarchy: HierarchyConfig,
    pub curation: CurationConfig,
}

impl MapConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
