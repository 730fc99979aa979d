//! Knowledge Base module - lore that refers to map entities.
//!
//! - **Facts**: lore entries linked to one or more entity IDs
//! - **LoreBook**: fact storage with a reverse index so renames touch only
//!   the facts that mention the renamed entity

mod fact;
mod graph;

pub use fact::*;
pub use graph::*;
