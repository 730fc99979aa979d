//! Error types for turn processing and its collaborators.

use map_rules::{MapDataError, NodeId};
use thiserror::Error;

/// Why a turn's map mutation was rejected. The pre-turn state is kept.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("malformed update payload: {0}")]
    MalformedPayload(String),

    #[error("no node matches `{0}`")]
    UnknownNode(String),

    #[error("invalid edge between `{source_ref}` and `{target_ref}`: {reason}")]
    InvalidEdge {
        source_ref: String,
        target_ref: String,
        reason: String,
    },

    #[error("hierarchy repair did not converge after {passes} passes")]
    HierarchyRepairStalled { passes: usize },

    #[error(transparent)]
    Map(#[from] MapDataError),

    #[error("could not parse update payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// The hierarchy arbitration collaborator could not give an answer.
#[derive(Debug, Clone, Error)]
pub enum ArbiterError {
    #[error("arbiter unavailable: {0}")]
    Unavailable(String),

    #[error("arbiter gave an unusable answer: {0}")]
    InvalidResponse(String),
}

/// The place-detail enrichment collaborator failed for one node.
#[derive(Debug, Clone, Error)]
#[error("could not enrich `{node}`: {reason}")]
pub struct EnrichError {
    pub node: NodeId,
    pub reason: String,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
