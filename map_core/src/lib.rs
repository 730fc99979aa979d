//! # Map Core
//!
//! The turn-by-turn side of the world map. This crate takes the update
//! payload the narrative produces each turn and folds it into the
//! `map_rules` state, keeping the hierarchy, references and paths coherent.
//!
//! ## Core Components
//!
//! - **orchestrator**: Runs the per-turn pipeline on a working copy
//! - **resolver**: Maps free text to node IDs and cascades renames
//! - **hierarchy**: Repairs parent/child level violations
//! - **curation**: Prunes redundant rumored edges, confirms sole links
//! - **knowledge_base**: Lore facts that reference map nodes
//! - **events**: Status and diagnostics channel for observers
//!
//! ## Design Philosophy
//!
//! - **Atomic Turns**: A failed turn leaves the map exactly as it was
//! - **Deterministic**: Same state and payload give the same map, IDs aside
//! - **Pluggable Judgement**: Arbitration and enrichment are async traits

pub mod config;
pub mod curation;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod knowledge_base;
pub mod orchestrator;
pub mod resolver;

pub use config::*;
pub use curation::*;
pub use error::*;
pub use events::*;
pub use hierarchy::*;
pub use knowledge_base::*;
pub use orchestrator::*;
pub use resolver::*;
