//! Hierarchy upgrade engine - keeps every parent strictly above its children.
//!
//! Repair runs in rounds:
//! 1. **Collect**: queue one violation per offending parent
//! 2. **Arbitrate**: ask the arbiter about each queued violation in turn
//! 3. **Apply**: mutate the tree synchronously, skipping stale violations
//!
//! Rounds repeat until no conflict is left. Without an arbiter, or when it
//! fails, every violation is promoted.

mod arbiter;

pub use arbiter::*;

use map_rules::{
    EdgeId, EdgeStatus, EdgeType, MapData, MapDataError, MapEdge, MapNode, NodeId, NodeType,
    FEATURE_LEVEL,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::HierarchyConfig;
use crate::error::TurnError;

/// A parent whose level is not strictly above one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub violator: NodeId,
    /// Representative offending child: the highest-level one, lowest ID on ties.
    pub child: NodeId,
}

/// A structural change made by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyRepair {
    ConvertedChildren {
        violator: NodeId,
        new_parent: Option<NodeId>,
        children: Vec<NodeId>,
    },
    Promoted {
        node: NodeId,
        from: NodeType,
        to: NodeType,
        connector: NodeId,
        redirected_edges: Vec<EdgeId>,
        new_edges: Vec<EdgeId>,
    },
}

impl HierarchyRepair {
    /// Edges this repair created.
    pub fn created_edges(&self) -> &[EdgeId] {
        match self {
            HierarchyRepair::Promoted { new_edges, .. } => new_edges,
            HierarchyRepair::ConvertedChildren { .. } => &[],
        }
    }
}

/// Whether any node sits at or above its parent's level.
///
/// Non-mutating. Parents missing from `nodes` are ignored.
pub fn has_hierarchy_conflict<'a>(nodes: impl IntoIterator<Item = &'a MapNode>) -> bool {
    let nodes: Vec<&MapNode> = nodes.into_iter().collect();
    let levels: BTreeMap<&NodeId, u8> = nodes.iter().map(|n| (&n.id, n.level())).collect();
    nodes.iter().any(|node| {
        node.parent()
            .and_then(|p| levels.get(p))
            .is_some_and(|parent_level| *parent_level >= node.level())
    })
}

/// Queue every current violation, one per parent, in parent ID order.
pub fn find_violations(map: &MapData) -> Vec<Violation> {
    let mut worst: BTreeMap<NodeId, &MapNode> = BTreeMap::new();
    for child in map.nodes() {
        let Some(parent) = map.parent_of(&child.id) else {
            continue;
        };
        if parent.level() < child.level() {
            continue;
        }
        worst
            .entry(parent.id.clone())
            .and_modify(|current| {
                if (child.level(), &child.id) < (current.level(), &current.id) {
                    *current = child;
                }
            })
            .or_insert(child);
    }
    worst
        .into_iter()
        .map(|(violator, child)| Violation {
            violator,
            child: child.id.clone(),
        })
        .collect()
}

/// Apply one decision. Returns `None` if the violation no longer holds.
pub fn apply_decision(
    map: &mut MapData,
    violation: &Violation,
    decision: HierarchyDecision,
) -> Result<Option<HierarchyRepair>, MapDataError> {
    let still_violating = match (map.get_node(&violation.violator), map.get_node(&violation.child)) {
        (Some(violator), Some(child)) => {
            child.parent() == Some(&violator.id) && violator.level() >= child.level()
        }
        _ => false,
    };
    if !still_violating {
        return Ok(None);
    }

    match decision {
        HierarchyDecision::ConvertChild => convert_children(map, &violation.violator),
        HierarchyDecision::Promote => promote_with_connector(map, &violation.violator),
    }
}

/// Move every offending child of `violator` up to the violator's parent.
fn convert_children(map: &mut MapData, violator: &NodeId) -> Result<Option<HierarchyRepair>, MapDataError> {
    let level = map
        .get_node(violator)
        .map(|n| n.level())
        .ok_or_else(|| MapDataError::UnknownNode(violator.clone()))?;
    let new_parent = map.parent_of(violator).map(|p| p.id.clone());
    let movers: Vec<NodeId> = map
        .children_of(violator)
        .into_iter()
        .filter(|c| c.level() <= level)
        .map(|c| c.id.clone())
        .collect();

    for child in &movers {
        map.set_parent(child, new_parent.clone())?;
    }

    Ok(Some(HierarchyRepair::ConvertedChildren {
        violator: violator.clone(),
        new_parent,
        children: movers,
    }))
}

/// Raise `violator` above its highest child and insert a connector under it.
fn promote_with_connector(
    map: &mut MapData,
    violator_id: &NodeId,
) -> Result<Option<HierarchyRepair>, MapDataError> {
    let violator = map
        .get_node(violator_id)
        .cloned()
        .ok_or_else(|| MapDataError::UnknownNode(violator_id.clone()))?;
    let children: Vec<NodeId> = map.children_of(violator_id).into_iter().map(|c| c.id.clone()).collect();
    let highest_child = map
        .children_of(violator_id)
        .into_iter()
        .map(|c| c.level())
        .min()
        .unwrap_or(FEATURE_LEVEL);

    // Children at region level leave nowhere to promote to.
    let Some(target_level) = highest_child.min(violator.level()).checked_sub(1) else {
        tracing::debug!(node = %violator_id, "cannot promote above region, converting children");
        return convert_children(map, violator_id);
    };
    let promoted_type = NodeType::for_level(target_level);
    let connector_type = promoted_type.demoted().unwrap_or(NodeType::Feature);

    let connector_name = format!("Entrance to {}", violator.place_name);
    let mut connector_id = NodeId::generate(&connector_name);
    while map.contains_node(&connector_id) {
        connector_id = NodeId::generate(&connector_name);
    }
    let mut connector = MapNode::with_id(connector_id.clone(), connector_name, connector_type)
        .with_parent(violator_id.clone())
        .with_status(violator.status)
        .with_description(format!("The way into {}.", violator.place_name));
    connector.visited = violator.visited;
    connector.position = violator.position;
    map.insert_node(connector);

    if let Some(node) = map.get_node_mut(violator_id) {
        node.node_type = promoted_type;
    }

    // Paths into the old place now arrive at its connector.
    let touching: Vec<EdgeId> = map
        .edges()
        .filter(|e| e.touches(violator_id))
        .map(|e| e.id.clone())
        .collect();
    for id in &touching {
        if let Some(edge) = map.get_edge_mut(id) {
            if &edge.source_node_id == violator_id {
                edge.source_node_id = connector_id.clone();
            }
            if &edge.target_node_id == violator_id {
                edge.target_node_id = connector_id.clone();
            }
        }
    }

    let status = if violator.status.is_unconfirmed() {
        EdgeStatus::Rumored
    } else {
        EdgeStatus::Open
    };
    let mut new_edges = Vec::new();
    for child in &children {
        if map.find_edge_between(&connector_id, child).is_some() {
            continue;
        }
        let edge = MapEdge::new(connector_id.clone(), child.clone())
            .with_status(status)
            .with_type(EdgeType::Path);
        new_edges.push(map.add_edge(edge)?);
    }

    Ok(Some(HierarchyRepair::Promoted {
        node: violator_id.clone(),
        from: violator.node_type,
        to: promoted_type,
        connector: connector_id,
        redirected_edges: touching,
        new_edges,
    }))
}

/// Runs repair rounds until the forest is level-consistent.
pub struct HierarchyEngine<'a> {
    arbiter: Option<&'a dyn HierarchyArbiter>,
    max_passes: usize,
}

impl<'a> HierarchyEngine<'a> {
    pub fn new(config: &HierarchyConfig) -> Self {
        Self {
            arbiter: None,
            max_passes: config.max_passes.max(1),
        }
    }

    pub fn with_arbiter(mut self, arbiter: Option<&'a dyn HierarchyArbiter>) -> Self {
        self.arbiter = arbiter;
        self
    }

    /// Repair every violation. Fails if conflicts survive `max_passes` rounds.
    pub async fn repair(&self, map: &mut MapData) -> Result<Vec<HierarchyRepair>, TurnError> {
        let mut repairs = Vec::new();

        for pass in 0..self.max_passes {
            let queue = find_violations(map);
            if queue.is_empty() {
                return Ok(repairs);
            }
            tracing::debug!(pass, violations = queue.len(), "hierarchy repair round");

            let mut decided = Vec::with_capacity(queue.len());
            for violation in queue {
                let decision = self.decide(map, &violation).await;
                decided.push((violation, decision));
            }

            for (violation, decision) in decided {
                if let Some(repair) = apply_decision(map, &violation, decision)? {
                    tracing::info!(violator = %violation.violator, ?decision, "hierarchy violation repaired");
                    repairs.push(repair);
                }
            }
        }

        if has_hierarchy_conflict(map.nodes()) {
            Err(TurnError::HierarchyRepairStalled {
                passes: self.max_passes,
            })
        } else {
            Ok(repairs)
        }
    }

    async fn decide(&self, map: &MapData, violation: &Violation) -> HierarchyDecision {
        let (Some(arbiter), Some(violator), Some(child)) = (
            self.arbiter,
            map.get_node(&violation.violator),
            map.get_node(&violation.child),
        ) else {
            return HierarchyDecision::Promote;
        };

        match arbiter.arbitrate(violator, child).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(violator = %violator.id, %err, "arbiter failed, promoting");
                HierarchyDecision::Promote
            }
        }
    }
}

/// Advisory: the type `node` should become to sit above all `children`.
pub fn suggest_level_upgrade(node: &MapNode, children: &[&MapNode]) -> Option<NodeType> {
    let highest = children.iter().map(|c| c.level()).min()?;
    if highest > node.level() {
        return None;
    }
    highest.checked_sub(1).map(NodeType::for_level)
}

/// Advisory: the type `node` should become to sit below `parent` while
/// staying above its own children.
pub fn suggest_level_downgrade(
    node: &MapNode,
    parent: Option<&MapNode>,
    children: &[&MapNode],
) -> Option<NodeType> {
    let parent = parent?;
    if parent.level() < node.level() {
        return None;
    }
    let target = parent.level() + 1;
    if target > FEATURE_LEVEL {
        return None;
    }
    if children.iter().any(|c| c.level() <= target) {
        return None;
    }
    Some(NodeType::for_level(target))
}
