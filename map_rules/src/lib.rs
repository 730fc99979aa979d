//! # Map Rules
//!
//! The data side of the world map - nodes, edges, hierarchy levels and the
//! nested circle layout. This crate is the single source of truth for map
//! state and does not talk to any collaborator.

pub mod entities;
pub mod layout;
pub mod mechanics;
pub mod world_state;

pub use entities::*;
pub use layout::*;
pub use mechanics::*;
pub use world_state::*;
