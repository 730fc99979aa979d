//! Events the orchestrator reports to observers (UI, logging, tests).
//!
//! Observers subscribe by handing the orchestrator an unbounded channel
//! sender; nothing is global.

use map_rules::{EdgeId, NodeId};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::hierarchy::HierarchyRepair;
use crate::resolver::RenameOutcome;

/// Pipeline stage currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnStage {
    ResolvingLocation,
    ApplyingUpdates,
    EnrichingPlaces,
    RepairingHierarchy,
    PropagatingVisits,
    CuratingEdges,
    LayingOut,
}

impl TurnStage {
    /// Short status line suitable for a loading indicator.
    pub fn describe(&self) -> &'static str {
        match self {
            TurnStage::ResolvingLocation => "Working out where you are...",
            TurnStage::ApplyingUpdates => "Updating the map...",
            TurnStage::EnrichingPlaces => "Filling in place details...",
            TurnStage::RepairingHierarchy => "Sorting out what lies inside what...",
            TurnStage::PropagatingVisits => "Marking visited places...",
            TurnStage::CuratingEdges => "Tidying up paths...",
            TurnStage::LayingOut => "Redrawing the map...",
        }
    }
}

/// What a turn did to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TurnDiagnostics {
    pub turn: u32,
    pub previous_node_id: Option<NodeId>,
    pub current_node_id: Option<NodeId>,
    /// Whether the location suggestion (or hint) matched a node.
    pub location_resolved: bool,
    pub added_nodes: Vec<NodeId>,
    pub updated_nodes: Vec<NodeId>,
    pub renamed: Vec<RenameOutcome>,
    pub added_edges: Vec<EdgeId>,
    pub updated_edges: Vec<EdgeId>,
    pub hierarchy_repairs: Vec<HierarchyRepair>,
    pub newly_visited: Vec<NodeId>,
    pub pruned_edges: Vec<EdgeId>,
    pub promoted_edges: Vec<EdgeId>,
    pub warnings: Vec<String>,
}

/// Messages emitted while a turn is processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MapEvent {
    Status(TurnStage),
    MapDataChanged {
        turn: u32,
        node_count: usize,
        edge_count: usize,
    },
    Diagnostics(TurnDiagnostics),
    TurnAborted { reason: String },
}

/// Optional event channel. Sending never fails the turn.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<MapEvent>>,
}

impl EventSink {
    pub fn new(sender: UnboundedSender<MapEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that drops everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: MapEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::debug!("map event receiver dropped");
            }
        }
    }

    pub fn status(&self, stage: TurnStage) {
        tracing::debug!(stage = ?stage, "{}", stage.describe());
        self.emit(MapEvent::Status(stage));
    }
}
